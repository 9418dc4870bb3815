//! Text-templating for shell-tool argv/env/script rendering (§4.7 step 2)
//!
//! Every string in a tool's `command`, `environment`, and `shell-script`
//! fields is rendered through [`minijinja`] with `{Args: coercedArgs, Env:
//! passthroughEnv}` in scope, plus a small standard library of string, list,
//! date, encoding, and arithmetic helper functions.

use std::collections::HashMap;

use minijinja::{Environment, Value as JinjaValue};

use super::error::ShellError;
use super::params::CoercedArg;

/// Build a fresh [`Environment`] with the standard helper function library
/// registered. Built per-render so hot-reloaded tool definitions never share
/// mutable template state.
fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);

    // String helpers
    env.add_filter("upper", |s: String| s.to_uppercase());
    env.add_filter("lower", |s: String| s.to_lowercase());
    env.add_filter("trim", |s: String| s.trim().to_string());
    env.add_filter("quote", |s: String| shell_quote(&s));

    // List helpers
    env.add_filter("join_with", |items: Vec<String>, sep: String| items.join(&sep));

    // Encoding helpers
    env.add_filter("base64", |s: String| {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(s)
    });
    env.add_filter("urlencode", |s: String| {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                    c.to_string()
                } else {
                    c.to_string().bytes().map(|b| format!("%{b:02X}")).collect()
                }
            })
            .collect::<String>()
    });

    // Date helper: render "now" formatted with a strftime-style pattern
    env.add_function("now", |format: Option<String>| {
        let now = chrono::Utc::now();
        format.map_or_else(|| now.to_rfc3339(), |fmt| now.format(&fmt).to_string())
    });

    // Arithmetic helpers
    env.add_function("add", |a: i64, b: i64| a + b);
    env.add_function("sub", |a: i64, b: i64| a - b);

    env
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Render one template string against the standard `{Args, Env}` context.
///
/// # Errors
///
/// Returns [`ShellError::Template`] if the template fails to parse or
/// render (undefined variable, filter error, etc).
pub fn render(
    template: &str,
    args: &HashMap<String, CoercedArg>,
    env_passthrough: &HashMap<String, String>,
) -> Result<String, ShellError> {
    let mut environment = self::environment();
    environment
        .add_template("tpl", template)
        .map_err(|e| ShellError::Template(e.to_string()))?;
    let tpl = environment.get_template("tpl").map_err(|e| ShellError::Template(e.to_string()))?;

    let args_map: HashMap<String, JinjaValue> = args
        .iter()
        .map(|(k, v)| (k.clone(), v.to_template_value()))
        .collect();

    let context = minijinja::context! {
        Args => args_map,
        Env => env_passthrough.clone(),
    };

    tpl.render(context).map_err(|e| ShellError::Template(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_args_and_env() {
        let mut args = HashMap::new();
        args.insert("name".to_string(), CoercedArg::Text("world".to_string()));
        let mut env = HashMap::new();
        env.insert("HOME".to_string(), "/root".to_string());

        let rendered = render("hello {{ Args.name }} from {{ Env.HOME }}", &args, &env).unwrap();
        assert_eq!(rendered, "hello world from /root");
    }

    #[test]
    fn applies_string_filters() {
        let mut args = HashMap::new();
        args.insert("name".to_string(), CoercedArg::Text("world".to_string()));
        let rendered = render("{{ Args.name | upper }}", &args, &HashMap::new()).unwrap();
        assert_eq!(rendered, "WORLD");
    }

    #[test]
    fn undefined_variable_is_a_template_error() {
        let result = render("{{ Args.missing }}", &HashMap::new(), &HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn quote_filter_escapes_single_quotes() {
        let mut args = HashMap::new();
        args.insert("name".to_string(), CoercedArg::Text("it's here".to_string()));
        let rendered = render("{{ Args.name | quote }}", &args, &HashMap::new()).unwrap();
        assert_eq!(rendered, "'it'\\''s here'");
    }
}
