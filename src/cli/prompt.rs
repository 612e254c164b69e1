use std::io::{self, BufRead, Write};

/// Print `question` and read one line from stdin. Only `yes` (any case) confirms;
/// end of input declines.
pub fn confirm(question: &str) -> bool {
    print!("{question}");
    let _ = io::stdout().flush();
    read_confirmation(io::stdin().lock())
}

fn read_confirmation(mut input: impl BufRead) -> bool {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => line.trim().eq_ignore_ascii_case("yes"),
    }
}
