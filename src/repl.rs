use miette::IntoDiagnostic;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const LOGO: &str = r#"
       _       _           _          _
  __ _| |_ __ | |__   __ _| |__   ___| |_
 / _` | | '_ \| '_ \ / _` | '_ \ / _ \ __|
| (_| | | |_) | | | | (_| | |_) |  __/ |_
 \__,_|_| .__/|_| |_|\__,_|_.__/ \___|\__|
        |_|
"#;

/// Interactive session. Lines are buffered until the brace depth returns to
/// zero, then the chunk gets the `#alphabet<repl>` header prepended and runs
/// through the full pipeline in a fresh VM.
pub fn start() -> miette::Result<()> {
    println!("{LOGO}");
    println!("Alphabet Language [v{VERSION}]");
    println!("Type 'q' to exit.\n");
    println!("Multi-line mode: type '{{' to open a block, then continue on the next lines.");
    println!("Example:");
    println!("  >>> c MyClass {{");
    println!("  ...   v m 5 getValue() {{");
    println!("  ...     r 42");
    println!("  ...   }}");
    println!("  ... }}\n");

    let mut editor = DefaultEditor::new().into_diagnostic()?;
    let mut buffer = String::new();
    let mut brace_depth: i32 = 0;

    loop {
        let prompt = if buffer.is_empty() { ">>> " } else { "... " };
        match editor.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() {
                    let trimmed = line.trim();
                    if matches!(trimmed, "q" | "quit" | "exit") {
                        break;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                }
                let _ = editor.add_history_entry(line.as_str());

                for c in line.chars() {
                    match c {
                        '{' => brace_depth += 1,
                        '}' => brace_depth -= 1,
                        _ => {}
                    }
                }
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                if brace_depth <= 0 {
                    let source = format!("#alphabet<repl>\n{buffer}");
                    if let Err(report) = crate::run_source(&source, "<repl>") {
                        eprintln!("{report:?}");
                    }
                    buffer.clear();
                    brace_depth = 0;
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                brace_depth = 0;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("repl error: {err}");
                break;
            }
        }
    }
    Ok(())
}
