use fluent_bundle::{FluentArgs, FluentBundle, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

/// Anything that can turn a message code plus named args into text.
pub trait Messages {
    fn msg(&self, code: &str, args: &[(&str, &str)]) -> String;
}

const EN_GB: &str = include_str!("../i18n/en-GB.ftl");

/// Fluent-backed messages for the CLI.
pub struct FluentLoc {
    bundle: FluentBundle<FluentResource>,
}

impl FluentLoc {
    /// Messages for `lang`. Only `en-GB` ships; unknown or unparsable tags get
    /// the `en-GB` strings.
    pub fn builtin(lang: &str) -> Self {
        let fallback: LanguageIdentifier = "en-GB".parse().unwrap_or_default();
        let langid: LanguageIdentifier = lang.parse().unwrap_or_else(|_| fallback.clone());
        let res = FluentResource::try_new(EN_GB.to_owned())
            .expect("built-in en-GB.ftl must parse");

        let mut bundle = FluentBundle::new(vec![langid, fallback]);
        bundle.set_use_isolating(false);
        bundle.add_resource(res).expect("built-in en-GB.ftl has duplicate ids");
        Self { bundle }
    }
}

impl Messages for FluentLoc {
    /// Returns the code itself if not found.
    fn msg(&self, code: &str, args: &[(&str, &str)]) -> String {
        let Some(msg) = self.bundle.get_message(code) else {
            return code.to_string();
        };
        let Some(pattern) = msg.value() else {
            return code.to_string();
        };

        let mut fa = FluentArgs::new();
        for (k, v) in args {
            fa.set(*k, FluentValue::from(*v));
        }

        let mut errs = vec![];
        let s = self.bundle.format_pattern(pattern, Some(&fa), &mut errs).to_string();

        if errs.is_empty() {
            s
        } else {
            code.to_string()
        }
    }
}

/// A no-op localizer you can use in tests.
pub struct NoopLoc;

impl Messages for NoopLoc {
    fn msg(&self, code: &str, _args: &[(&str, &str)]) -> String {
        code.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_builtin_messages() {
        let loc = FluentLoc::builtin("en-GB");
        let s = loc.msg("verify-ok", &[("matched", "3"), ("format", "full")]);
        assert_eq!(s, "OK: 3 files matched (full format)");
        let s = loc.msg(
            "verify-failure",
            &[("mismatched", "1"), ("matched", "2"), ("format", "partial")],
        );
        assert!(s.starts_with("Failure: 1 mismatched"));
    }

    #[test]
    fn unknown_code_falls_back() {
        assert_eq!(FluentLoc::builtin("xx").msg("no-such-message", &[]), "no-such-message");
        assert_eq!(NoopLoc.msg("verify-ok", &[("matched", "1")]), "verify-ok");
    }

    #[test]
    fn missing_argument_falls_back_to_code() {
        let loc = FluentLoc::builtin("en");
        assert_eq!(loc.msg("verify-ok", &[]), "verify-ok");
    }
}
