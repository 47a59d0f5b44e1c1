//! # devserve Help Text
//!
//! File: cli/src/core/help.rs
//!
//! Renders usage text from the same parameter table the parser consumes.
//! This is a pure function of the definitions: nothing here knows about the
//! server's actual parameters.
//!
use crate::core::args::{Form, ParameterDefinition};

/// Column at which descriptions start.
const DESCRIPTION_COLUMN: usize = 24;

/// # Render Usage (`render_usage`)
///
/// Builds the full help text: a usage line, then one line per positional
/// parameter and one per flag parameter, in declaration order.
pub fn render_usage(program: &str, definitions: &[ParameterDefinition]) -> String {
    let mut positionals: Vec<&ParameterDefinition> = definitions
        .iter()
        .filter(|d| matches!(d.form, Form::Positional(_)))
        .collect();
    positionals.sort_by_key(|d| match d.form {
        Form::Positional(index) => index,
        Form::Flag(_) => usize::MAX,
    });

    let mut out = format!("Usage: {} [options]", program);
    for def in &positionals {
        out.push_str(&format!(" [{}]", def.key));
    }
    out.push('\n');

    if !positionals.is_empty() {
        out.push_str("\nArguments:\n");
        for def in &positionals {
            out.push_str(&entry_line(def.key.to_string(), def));
        }
    }

    let flags: Vec<&ParameterDefinition> = definitions
        .iter()
        .filter(|d| matches!(d.form, Form::Flag(_)))
        .collect();
    if !flags.is_empty() {
        out.push_str("\nOptions:\n");
        for def in flags {
            out.push_str(&entry_line(spelling(def), def));
        }
    }

    out
}

/// Flag spellings joined with `/`, plus the value placeholder (`-p/-port <n>`).
fn spelling(def: &ParameterDefinition) -> String {
    let Form::Flag(aliases) = def.form else {
        return def.key.to_string();
    };
    let mut text = aliases
        .iter()
        .map(|a| format!("-{}", a))
        .collect::<Vec<_>>()
        .join("/");
    if let Some(placeholder) = def.kind.placeholder() {
        text.push(' ');
        text.push_str(placeholder);
    }
    text
}

fn entry_line(label: String, def: &ParameterDefinition) -> String {
    let mut line = format!("  {}", label);
    if line.len() + 2 > DESCRIPTION_COLUMN {
        line.push_str("  ");
    } else {
        line.push_str(&" ".repeat(DESCRIPTION_COLUMN - line.len()));
    }
    line.push_str(def.description);
    if let Some(default) = &def.default {
        let shown = default.to_string();
        if !shown.is_empty() {
            line.push_str(&format!(" (default: {})", shown));
        }
    }
    line.push('\n');
    line
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::args::{Value, ValueKind};

    #[test]
    fn test_render_usage_lists_every_definition_in_order() {
        let definitions = vec![
            ParameterDefinition::flag("port", &["p", "port"], ValueKind::Number)
                .with_default(Value::Number(8080.0))
                .describe("Port to listen on"),
            ParameterDefinition::flag("watch", &["w", "watch"], ValueKind::Boolean)
                .describe("Reload on change"),
            ParameterDefinition::positional("dirpath", 0, ValueKind::String)
                .with_default(Value::String(".".into()))
                .describe("Directory to serve"),
        ];

        let text = render_usage("devserve", &definitions);

        assert!(text.starts_with("Usage: devserve [options] [dirpath]\n"));
        assert!(text.contains("  -p/-port <n>          Port to listen on (default: 8080)\n"));
        assert!(text.contains("  -w/-watch             Reload on change\n"));
        assert!(text.contains("  dirpath               Directory to serve (default: .)\n"));
        assert!(text.find("Arguments:").unwrap() < text.find("Options:").unwrap());
        assert!(text.find("-port").unwrap() < text.find("-watch").unwrap());
    }

    #[test]
    fn test_long_labels_still_separated() {
        let definitions = vec![ParameterDefinition::flag(
            "a-very-long-parameter",
            &["a-very-long-parameter-name"],
            ValueKind::String,
        )
        .describe("desc")];
        let text = render_usage("x", &definitions);
        assert!(text.contains("-a-very-long-parameter-name <value>  desc"));
    }
}
