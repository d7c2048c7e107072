//! UI utilities for the terminal client.

use std::io::Write;

/// Redisplay the prompt after printing a notification
pub fn redisplay_prompt(prompt: &str) {
    print!("{}> ", prompt);
    std::io::stdout().flush().ok();
}

/// Print a block of text and restore the prompt
pub fn print_with_prompt(text: &str, prompt: &str) {
    print!("{}", text);
    redisplay_prompt(prompt);
}
