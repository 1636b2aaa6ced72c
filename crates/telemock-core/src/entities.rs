// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity annotation for message text (commands, mentions, URLs, hashtags).
//!
//! Entities are emitted grouped by kind in the order commands, mentions,
//! URLs, hashtags. Offsets and lengths are counted in UTF-16 code units,
//! matching the Bot API. Commands, mentions and hashtags that fall inside a
//! URL are not reported.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{EntityKind, MessageEntity};

static COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(/[A-Za-z0-9_]+)").unwrap());
static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@[A-Za-z0-9_]{5,32}").unwrap());
static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(#[A-Za-z0-9_]+)").unwrap());

/// Scan `text` and return every entity found.
pub fn parse_entities(text: &str) -> Vec<MessageEntity> {
    if text.is_empty() {
        return Vec::new();
    }

    let urls: Vec<Range<usize>> = URL.find_iter(text).map(|m| m.range()).collect();
    let inside_url = |r: &Range<usize>| urls.iter().any(|u| u.start <= r.start && r.end <= u.end);

    let commands = COMMAND
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.range());
    let mentions = MENTION.find_iter(text).map(|m| m.range());
    let hashtags = HASHTAG
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.range());

    let mut entities = Vec::new();
    entities.extend(
        commands
            .filter(|r| !inside_url(r))
            .map(|r| entity(text, EntityKind::BotCommand, r)),
    );
    entities.extend(
        mentions
            .filter(|r| !inside_url(r))
            .map(|r| entity(text, EntityKind::Mention, r)),
    );
    entities.extend(urls.iter().cloned().map(|r| entity(text, EntityKind::Url, r)));
    entities.extend(
        hashtags
            .filter(|r| !inside_url(r))
            .map(|r| entity(text, EntityKind::Hashtag, r)),
    );
    entities
}

/// True when the text starts with a bot command.
pub fn is_command(text: &str) -> bool {
    command(text).is_some()
}

/// The leading command of `text` without any `@botname` suffix, e.g. `/start`.
pub fn command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let m = COMMAND.captures(first)?.get(1)?;
    if m.start() != 0 {
        return None;
    }
    Some(m.as_str())
}

fn entity(text: &str, kind: EntityKind, range: Range<usize>) -> MessageEntity {
    MessageEntity {
        kind,
        offset: utf16_len(&text[..range.start]),
        length: utf16_len(&text[range]),
    }
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(text: &str) -> Vec<(EntityKind, usize, usize)> {
        parse_entities(text)
            .into_iter()
            .map(|e| (e.kind, e.offset, e.length))
            .collect()
    }

    #[test]
    fn empty_text_has_no_entities() {
        assert!(parse_entities("").is_empty());
    }

    #[test]
    fn finds_leading_command() {
        assert_eq!(kinds("/start now"), vec![(EntityKind::BotCommand, 0, 6)]);
    }

    #[test]
    fn groups_entities_by_kind_in_fixed_order() {
        let text = "#news from @channel_bot see https://example.com /help";
        let found: Vec<EntityKind> = parse_entities(text).into_iter().map(|e| e.kind).collect();
        assert_eq!(
            found,
            vec![
                EntityKind::BotCommand,
                EntityKind::Mention,
                EntityKind::Url,
                EntityKind::Hashtag
            ]
        );
    }

    #[test]
    fn short_mentions_are_ignored() {
        assert!(parse_entities("hi @bob").is_empty());
        assert_eq!(kinds("hi @bobby"), vec![(EntityKind::Mention, 3, 6)]);
    }

    #[test]
    fn url_path_is_not_a_command() {
        let found = kinds("docs at https://example.com/start#intro");
        assert_eq!(found, vec![(EntityKind::Url, 8, 31)]);
    }

    #[test]
    fn commands_and_hashtags_need_a_word_start() {
        assert!(parse_entities("either/or and x#y").is_empty());
        assert_eq!(
            kinds("x#y #tag"),
            vec![(EntityKind::Hashtag, 4, 4)]
        );
        assert_eq!(
            kinds("see http://x.io/a#b @alice_x"),
            vec![(EntityKind::Mention, 20, 8), (EntityKind::Url, 4, 15)]
        );
    }

    #[test]
    fn offsets_are_utf16_units() {
        // The emoji is two UTF-16 code units and four UTF-8 bytes.
        let found = kinds("😀 /go");
        assert_eq!(found, vec![(EntityKind::BotCommand, 3, 3)]);
    }

    #[test]
    fn command_strips_arguments() {
        assert_eq!(command("/start payload"), Some("/start"));
        assert_eq!(command("hello /start"), None);
        assert!(is_command("/help"));
        assert!(!is_command("help"));
    }

    proptest! {
        #[test]
        fn entity_spans_stay_inside_text(text in "[ a-z@#/:._0-9]{0,64}") {
            let total = utf16_len(&text);
            for e in parse_entities(&text) {
                prop_assert!(e.length > 0);
                prop_assert!(e.offset + e.length <= total);
            }
        }
    }
}
