//! Output formatting for the requester CLI.
//!
//! Success lines go to stdout so they can be piped; failures and the summary
//! go to stderr. Uses only the `console` crate for styling.

use console::style;
use requester_lib::{Request, RequesterError};
use serde::Serialize;
use std::time::Duration;

/// One successful response in `--json` mode.
#[derive(Debug, Serialize, PartialEq)]
pub struct SuccessRecord {
    pub url: String,
    pub md5: String,
    pub bytes: usize,
}

impl SuccessRecord {
    pub fn new(request: &Request, body: &[u8]) -> Self {
        Self {
            url: request.target().to_string(),
            md5: body_digest(body),
            bytes: body.len(),
        }
    }
}

/// Lowercase hex MD5 of a response body.
pub fn body_digest(body: &[u8]) -> String {
    format!("{:x}", md5::compute(body))
}

/// Plain `<url> <md5>` line.
pub fn format_success(request: &Request, body: &[u8]) -> String {
    format!("{} {}", request.target(), body_digest(body))
}

pub fn format_success_json(request: &Request, body: &[u8]) -> serde_json::Result<String> {
    serde_json::to_string(&SuccessRecord::new(request, body))
}

pub fn print_success(request: &Request, body: &[u8], json: bool) {
    if json {
        match format_success_json(request, body) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Error: failed to encode result for {}: {}", request.target(), e),
        }
    } else {
        println!("{}", format_success(request, body));
    }
}

pub fn print_failure(error: &RequesterError) {
    eprintln!("{} {}", style("✗").red().bold(), error);
}

pub fn print_summary(succeeded: usize, failed: usize, duration: Duration) {
    let failed_text = format!("{} failed", failed);
    let failed_styled = if failed > 0 {
        style(failed_text).red()
    } else {
        style(failed_text).dim()
    };

    eprintln!(
        "{} {}, {} in {:.2}s",
        style("Summary:").bold(),
        style(format!("{} succeeded", succeeded)).green(),
        failed_styled,
        duration.as_secs_f64()
    );
}
