//! The three prompt templates that drive the worker/reviewer dialogue
//! (spec §4.6).
//!
//! Plain `format!` templates, not a templating engine — matching the
//! teacher's inline string-building style throughout `csa-session`. Exact
//! wording is fixed: the `<verdict>` tag syntax is part of the wire protocol
//! between two instances of the same agent and must not drift without
//! coordinating [`crate::verdict`]'s parser.

/// First turn: implement the plan from scratch.
pub fn worker_prompt(plan_content: &str) -> String {
    format!(
        "You are implementing an approved plan on an isolated branch.\n\n\
         <plan>\n{plan_content}\n</plan>\n\n\
         Implement the plan in full. Run this repository's local test, lint, \
         and typecheck scripts if they exist, and fix anything they flag. You \
         may add verification scripts of your own if that helps you confirm \
         correctness. Commit your work locally as you go; do not push or open \
         a pull request — this branch stays local until a human merges it."
    )
}

/// Reviewer turn: judge the diff against the plan and render a verdict.
pub fn review_prompt(plan_content: &str, diff: &str) -> String {
    format!(
        "You are reviewing a change against the plan it claims to implement.\n\n\
         <plan>\n{plan_content}\n</plan>\n\n\
         <diff>\n{diff}\n</diff>\n\n\
         Assess completeness, correctness, and quality. Point out anything \
         that is missing, wrong, or worth revising. End your review with \
         exactly one terminal verdict tag, containing only APPROVE or \
         REQUEST_CHANGES, e.g. <verdict>APPROVE</verdict>."
    )
}

/// Resume turn: address the reviewer's feedback.
pub fn revision_prompt(feedback: &str) -> String {
    format!(
        "The reviewer requested changes:\n\n\
         <review_feedback>\n{feedback}\n</review_feedback>\n\n\
         Address this feedback and commit the result locally."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_prompt_embeds_plan_content() {
        let prompt = worker_prompt("do the thing");
        assert!(prompt.contains("<plan>\ndo the thing\n</plan>"));
        assert!(prompt.contains("do not push"));
    }

    #[test]
    fn review_prompt_embeds_plan_and_diff() {
        let prompt = review_prompt("the plan", "the diff");
        assert!(prompt.contains("<plan>\nthe plan\n</plan>"));
        assert!(prompt.contains("<diff>\nthe diff\n</diff>"));
        assert!(prompt.contains("<verdict>"));
    }

    #[test]
    fn revision_prompt_embeds_feedback() {
        let prompt = revision_prompt("fix the thing");
        assert!(prompt.contains("<review_feedback>\nfix the thing\n</review_feedback>"));
    }
}
