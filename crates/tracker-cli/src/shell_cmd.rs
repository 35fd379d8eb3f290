//! `install-shell-function` (spec §6): `tracker checkout <id>` prints a
//! worktree path but can't `cd` its parent shell there itself, so this
//! prints a wrapper function the user sources into their shell.

use anyhow::Result;

const BASH_FUNCTION: &str = r#"tracker() {
    if [ "$1" = "checkout" ] && [ -n "$2" ]; then
        local dir
        dir=$(command tracker checkout "$2") && cd "$dir"
    else
        command tracker "$@"
    fi
}"#;

const ZSH_FUNCTION: &str = r#"tracker() {
    if [[ "$1" == "checkout" && -n "$2" ]]; then
        local dir
        dir=$(command tracker checkout "$2") && cd "$dir"
    else
        command tracker "$@"
    fi
}"#;

pub fn install_shell_function(auto: bool, bash: bool, zsh: bool) -> Result<()> {
    let shell = if zsh {
        "zsh"
    } else if bash {
        "bash"
    } else {
        detect_shell()
    };

    let function = if shell == "zsh" { ZSH_FUNCTION } else { BASH_FUNCTION };
    println!("{function}");

    if auto {
        let rc_file = if shell == "zsh" { "~/.zshrc" } else { "~/.bashrc" };
        println!(
            "\n# Add this automatically with:\necho '{function}' >> {rc_file} && source {rc_file}"
        );
    } else {
        println!("\n# Add the function above to your shell's rc file, or rerun with --auto.");
    }

    Ok(())
}

fn detect_shell() -> &'static str {
    match std::env::var("SHELL") {
        Ok(shell) if shell.ends_with("zsh") => "zsh",
        _ => "bash",
    }
}
