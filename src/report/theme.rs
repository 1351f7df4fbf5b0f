use crossterm::style::Stylize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn from_config_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "always" | "on" | "true" => ColorChoice::Always,
            "never" | "off" | "false" | "mono" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        }
    }

    /// `Auto` colours only when stdout is a terminal and `NO_COLOR` is unset.
    pub fn enabled(self, stdout_is_terminal: bool) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => stdout_is_terminal && std::env::var_os("NO_COLOR").is_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warn_percent: f64,
    pub critical_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            warn_percent: 70.0,
            critical_percent: 90.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Thresholds {
    pub fn severity(&self, percent: f64) -> Severity {
        if percent >= self.critical_percent {
            Severity::Critical
        } else if percent >= self.warn_percent {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }
}

pub fn paint(text: &str, severity: Severity, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match severity {
        Severity::Normal => text.green().to_string(),
        Severity::Warning => text.yellow().to_string(),
        Severity::Critical => text.red().bold().to_string(),
    }
}

pub fn heading(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}
