use crate::commands::Reply;
use crate::ui::{stderr_theme, stdout_theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::CRYSTAL, text.style(stdout_theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(stdout_theme().accepted.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(stderr_theme().refused.clone()));
}

/// Print a command reply: failures go to stderr, multi-line listings verbatim
pub fn reply(reply: &Reply) {
    if !reply.ok {
        error(&reply.text);
    } else if reply.text.contains('\n') {
        println!("{}", reply.text);
    } else {
        success(&reply.text);
    }
}
