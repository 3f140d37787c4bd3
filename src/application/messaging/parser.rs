//! Command text parser - splits marker-prefixed text into identifier and arguments

use crate::domain::entities::COMMAND_MARKER;

/// A marker-prefixed message split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandText<'a> {
    /// Identifier after the marker, without any `@botname` suffix. May be empty.
    pub identifier: &'a str,
    /// Bot username from `/cmd@botname`
    pub mention: Option<&'a str>,
    /// Everything after the first whitespace, trimmed
    pub args: &'a str,
}

impl<'a> CommandText<'a> {
    /// Returns `None` for text that does not start with the marker
    pub fn parse(text: &'a str) -> Option<Self> {
        let rest = text.strip_prefix(COMMAND_MARKER)?;

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };

        let (identifier, mention) = match head.split_once('@') {
            Some((identifier, mention)) => (identifier, Some(mention)),
            None => (head, None),
        };

        Some(Self {
            identifier,
            mention,
            args,
        })
    }

    pub fn first_arg(&self) -> Option<&'a str> {
        self.args.split_whitespace().next()
    }

    /// True unless the `@botname` suffix names a bot other than `username`.
    /// Telegram usernames are case-insensitive.
    pub fn is_addressed_to(&self, username: Option<&str>) -> bool {
        match (self.mention, username) {
            (Some(mention), Some(username)) => mention.eq_ignore_ascii_case(username),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(CommandText::parse("hello /start"), None);
        assert_eq!(CommandText::parse(""), None);
        assert_eq!(CommandText::parse(" /start"), None);
    }

    #[test]
    fn test_parse_with_args() {
        let cmd = CommandText::parse("/track  https://example.com/a  extra ").unwrap();
        assert_eq!(cmd.identifier, "track");
        assert_eq!(cmd.mention, None);
        assert_eq!(cmd.args, "https://example.com/a  extra");
        assert_eq!(cmd.first_arg(), Some("https://example.com/a"));
    }

    #[test]
    fn test_parse_mention_suffix() {
        let cmd = CommandText::parse("/list@tracker_bot").unwrap();
        assert_eq!(cmd.identifier, "list");
        assert_eq!(cmd.mention, Some("tracker_bot"));
        assert_eq!(cmd.args, "");
    }

    #[test]
    fn test_addressee() {
        let cmd = CommandText::parse("/list@Tracker_Bot").unwrap();
        assert!(cmd.is_addressed_to(Some("tracker_bot")));
        assert!(!cmd.is_addressed_to(Some("other_bot")));
        assert!(cmd.is_addressed_to(None));

        let bare = CommandText::parse("/list").unwrap();
        assert!(bare.is_addressed_to(Some("tracker_bot")));
    }

    #[test]
    fn test_bare_marker_has_empty_identifier() {
        let cmd = CommandText::parse("/").unwrap();
        assert_eq!(cmd.identifier, "");
        assert_eq!(cmd.first_arg(), None);

        let cmd = CommandText::parse("/ start").unwrap();
        assert_eq!(cmd.identifier, "");
        assert_eq!(cmd.args, "start");
    }

    #[test]
    fn test_identifier_stops_at_newline() {
        let cmd = CommandText::parse("/track\nhttps://example.com").unwrap();
        assert_eq!(cmd.identifier, "track");
        assert_eq!(cmd.args, "https://example.com");
    }
}
