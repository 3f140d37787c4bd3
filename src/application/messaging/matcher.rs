//! Rule compiler - turns the command registry into an ordered, total rule set
//!
//! Every text is accepted by exactly one rule:
//! - a known-command rule when it starts with the marker and its identifier
//!   is a registered command (arguments may follow after whitespace);
//! - the unknown-command rule when it starts with the marker and its
//!   identifier is anything else, including the empty identifier;
//! - the plain-text rule when it does not start with the marker.
//!
//! Matching is token-boundary aware: `/trackme` is an unknown command, not
//! `/track`. A command suffixed with another bot's `@username` is not
//! addressed to us and counts as plain text.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::handler::Handler;
use super::parser::CommandText;
use crate::domain::entities::{BotCommand, CommandRegistry};

/// Predicate over raw message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Marker followed by exactly this command's identifier
    Command(BotCommand),
    /// Marker followed by an identifier outside `known`
    UnknownCommand { known: BTreeSet<&'static str> },
    /// Anything not starting with the marker
    PlainText,
}

impl Matcher {
    /// Accept `text` as seen by the bot called `username`. Without a
    /// username any `@name` suffix is accepted.
    pub fn accepts(&self, text: &str, username: Option<&str>) -> bool {
        let command = CommandText::parse(text).filter(|cmd| cmd.is_addressed_to(username));
        match (self, command) {
            (Matcher::Command(command), Some(cmd)) => cmd.identifier == command.identifier(),
            (Matcher::UnknownCommand { known }, Some(cmd)) => !known.contains(cmd.identifier),
            (Matcher::PlainText, None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Command(command) => write!(f, "command {}", command),
            Matcher::UnknownCommand { .. } => write!(f, "unknown command"),
            Matcher::PlainText => write!(f, "plain text"),
        }
    }
}

/// Priority-ordered binding of a matcher to a handler
#[derive(Clone)]
pub struct Rule {
    priority: usize,
    matcher: Matcher,
    handler: Arc<dyn Handler>,
}

impl Rule {
    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("priority", &self.priority)
            .field("matcher", &self.matcher)
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// Compiled rules in evaluation order. Read-only once built.
#[derive(Clone, Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
    username: Option<String>,
}

impl RuleSet {
    pub fn compile(
        registry: &CommandRegistry,
        unknown_command: Arc<dyn Handler>,
        plain_text: Arc<dyn Handler>,
    ) -> Self {
        let rules: Vec<Rule> = registry
            .iter()
            .map(|(command, handler)| (Matcher::Command(command), Arc::clone(handler)))
            .chain([
                (
                    Matcher::UnknownCommand {
                        known: registry.identifiers().collect(),
                    },
                    unknown_command,
                ),
                (Matcher::PlainText, plain_text),
            ])
            .enumerate()
            .map(|(priority, (matcher, handler))| Rule {
                priority,
                matcher,
                handler,
            })
            .collect();

        tracing::debug!("Compiled {} routing rules", rules.len());
        Self {
            rules,
            username: None,
        }
    }

    /// Only answer `/cmd@name` when `name` is this bot's username
    pub fn for_bot(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    fn accepts(&self, rule: &Rule, text: &str) -> bool {
        rule.matcher.accepts(text, self.username.as_deref())
    }

    /// First rule accepting the text
    pub fn route(&self, text: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| self.accepts(r, text))
    }

    /// Every rule accepting the text
    pub fn matching(&self, text: &str) -> Vec<&Rule> {
        self.rules.iter().filter(|r| self.accepts(r, text)).collect()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::handler::test_support::NamedHandler;

    fn rule_set() -> RuleSet {
        let registry = BotCommand::ALL
            .iter()
            .fold(CommandRegistry::builder(), |b, c| {
                b.bind(*c, Arc::new(NamedHandler::new(c.identifier())))
            })
            .build()
            .unwrap();
        RuleSet::compile(
            &registry,
            Arc::new(NamedHandler::new("unknown")),
            Arc::new(NamedHandler::new("plain")),
        )
    }

    fn routed(rules: &RuleSet, text: &str) -> String {
        rules.route(text).unwrap().handler().name().to_string()
    }

    const CORPUS: &[&str] = &[
        "",
        " ",
        "/",
        "//",
        "/ ",
        "/start",
        "/start now",
        "/help me",
        "/track https://example.com",
        "/track",
        "/tracker xyz",
        "/trackme",
        "/untrack https://example.com",
        "/untracked",
        "/list",
        "/list@tracker_bot",
        "/lists",
        "/chat_id",
        "/chat",
        "/chat_ids",
        "/START",
        "/@bot",
        "hello there",
        " /start",
        "start",
        "ссылка /track",
        "\n/list",
        "/💥",
    ];

    #[test]
    fn test_priority_order() {
        let rules = rule_set();
        assert_eq!(rules.len(), BotCommand::ALL.len() + 2);

        let n = rules.len();
        assert!(matches!(rules.rules()[n - 2].matcher(), Matcher::UnknownCommand { .. }));
        assert_eq!(rules.rules()[n - 1].matcher(), &Matcher::PlainText);
        for (i, rule) in rules.rules().iter().enumerate() {
            assert_eq!(rule.priority(), i);
        }
    }

    #[test]
    fn test_every_text_matches_exactly_one_rule() {
        let rules = rule_set();
        for text in CORPUS {
            let matched = rules.matching(text);
            assert_eq!(matched.len(), 1, "{:?} matched {:?}", text, matched);
        }
    }

    #[test]
    fn test_known_commands_with_trailing_args() {
        let rules = rule_set();
        for command in BotCommand::ALL {
            assert_eq!(routed(&rules, &command.token()), command.identifier());
            let with_args = format!("{} some args here", command.token());
            assert_eq!(routed(&rules, &with_args), command.identifier());
        }
    }

    #[test]
    fn test_token_boundary() {
        let rules = rule_set();
        assert_eq!(routed(&rules, "/tracker xyz"), "unknown");
        assert_eq!(routed(&rules, "/trackme"), "unknown");
        assert_eq!(routed(&rules, "/chat"), "unknown");
        assert_eq!(routed(&rules, "/track https://example.com"), "track");
    }

    #[test]
    fn test_unknown_and_plain_fallbacks() {
        let rules = rule_set();
        assert_eq!(routed(&rules, "/"), "unknown");
        assert_eq!(routed(&rules, "/START"), "unknown");
        assert_eq!(routed(&rules, "hello there"), "plain");
        assert_eq!(routed(&rules, ""), "plain");
        assert_eq!(routed(&rules, " /start"), "plain");
    }

    #[test]
    fn test_mention_suffix_routes_to_command() {
        let rules = rule_set();
        assert_eq!(routed(&rules, "/list@tracker_bot"), "list");
        assert_eq!(routed(&rules, "/track@tracker_bot https://example.com"), "track");
    }

    #[test]
    fn test_commands_for_other_bots_are_plain_text() {
        let rules = rule_set().for_bot("tracker_bot");
        assert_eq!(routed(&rules, "/list@tracker_bot"), "list");
        assert_eq!(routed(&rules, "/list@Tracker_Bot"), "list");
        assert_eq!(routed(&rules, "/list"), "list");
        assert_eq!(routed(&rules, "/list@other_bot"), "plain");
        assert_eq!(routed(&rules, "/nope@other_bot"), "plain");
        assert_eq!(routed(&rules, "/nope@tracker_bot"), "unknown");

        for text in CORPUS.iter().chain(&["/track@other_bot https://example.com", "/@other_bot"]) {
            assert_eq!(rules.matching(text).len(), 1, "{:?}", text);
        }
    }

    #[test]
    fn test_unknown_matcher_is_complement_of_known() {
        let unknown = Matcher::UnknownCommand {
            known: BotCommand::ALL.iter().map(|c| c.identifier()).collect(),
        };
        for command in BotCommand::ALL {
            assert!(!unknown.accepts(&command.token(), None));
            assert!(Matcher::Command(command).accepts(&command.token(), None));
        }
        assert!(unknown.accepts("/weather", None));
        assert!(!unknown.accepts("weather", None));
        assert!(!Matcher::PlainText.accepts("/weather", None));
    }
}
