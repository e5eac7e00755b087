//! User-visible output
//!
//! This module provides the [`Logger`] that reports run progress on standard
//! output. It supports quiet and verbose modes. Diagnostic events go through
//! `tracing` instead and are configured in `main`.

use std::time::Duration;

/// Logger responsible for all user-visible output
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
        }
    }

    /// Main section heading
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n=== {} ===", title);
        }
    }

    /// Sub-section heading
    pub fn subsection(&self, title: &str) {
        if !self.quiet {
            println!("\n--- {} ---", title);
        }
    }

    /// Information message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("ℹ️  {}", message);
        }
    }

    /// Success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("✅ {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("⚠️  WARNING: {}", message);
        }
    }

    /// Error message, printed even in quiet mode
    pub fn error(&self, message: &str) {
        println!("❌ ERROR: {}", message);
    }

    /// Step information
    pub fn step(&self, message: &str) {
        if !self.quiet {
            println!("▶️  {}", message);
        }
    }

    /// Detailed information (only shown in verbose mode)
    pub fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("   {}", message);
        }
    }

    /// One line of progress streamed from the container engine
    pub fn stream(&self, line: &str) {
        if !self.quiet && !line.is_empty() {
            println!("   {}", line);
        }
    }

    // Structured list output
    pub fn list(&self, title: &str, items: &[String]) {
        if !self.quiet {
            self.subsection(title);
            for (i, item) in items.iter().enumerate() {
                println!("  {}. {}", i + 1, item);
            }

            if items.is_empty() {
                println!("  (No items to display)");
            }
        }
    }

    /// Key-value pair summary display
    pub fn summary_kv(&self, title: &str, items: &[(&str, String)]) {
        if !self.quiet {
            self.subsection(title);
            for (key, value) in items {
                println!("  {}: {}", key, value);
            }
        }
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m{}s", secs / 60, secs % 60)
        } else {
            format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}

/// Render an engine progress event the way `docker pull` prints it
pub fn progress_line(id: Option<&str>, status: Option<&str>, progress: Option<&str>) -> String {
    let mut line = String::new();
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        line.push_str(id);
        line.push_str(": ");
    }
    if let Some(status) = status {
        line.push_str(status);
    }
    if let Some(progress) = progress.filter(|progress| !progress.is_empty()) {
        line.push(' ');
        line.push_str(progress);
    }
    line
}
