//! Reply chunking.
//!
//! A webhook reply is a single string that may be several paragraphs long.
//! [`split_into_chunks`] breaks it into bubble-sized pieces that the presenter
//! reveals one at a time.  The function is pure: the same text and limit always
//! produce the same chunks.

use std::sync::OnceLock;

use regex::Regex;

/// Chunks shorter than this many characters are folded into the previous one.
pub const SHORT_CHUNK_CHARS: usize = 30;

static PARAGRAPH_REGEX: OnceLock<Regex> = OnceLock::new();
static LIST_ITEM_REGEX: OnceLock<Regex> = OnceLock::new();
static SENTENCE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Two or more newlines separate paragraphs.
fn paragraph_regex() -> &'static Regex {
    PARAGRAPH_REGEX.get_or_init(|| Regex::new(r"\n{2,}").expect("paragraph regex is valid"))
}

/// Anchored: a bold numbered item, a numbered item on a new line, or a bullet.
fn list_item_regex() -> &'static Regex {
    LIST_ITEM_REGEX.get_or_init(|| {
        Regex::new(r"^(?:[0-9]+\.\s+\*\*|\n[0-9]+\.\s|\n[-•]\s)").expect("list item regex is valid")
    })
}

/// A sentence keeps its run of terminators.  The leading `[.!?]*` only ever
/// matches at the start of the text, so a reply that opens with "..." keeps it.
fn sentence_regex() -> &'static Regex {
    SENTENCE_REGEX
        .get_or_init(|| Regex::new(r"[.!?]*[^.!?]+[.!?]*").expect("sentence regex is valid"))
}

/// Split `text` into the ordered chunks shown as separate bubbles.
///
/// Paragraph breaks win; a single paragraph is split at list items, and
/// failing that at sentence boundaries.  Short chunks are then merged into
/// their predecessor and chunks longer than `max_len` characters are re-packed
/// sentence by sentence.  A merge does not consult `max_len`, so a merged
/// chunk may end up longer.  The result is never empty: when nothing
/// survives, the untouched `text` is returned as the only chunk.
///
/// ```
/// use hookchat::split_into_chunks;
///
/// let chunks = split_into_chunks("no punctuation at all here", 200);
/// assert_eq!(chunks, vec!["no punctuation at all here"]);
/// assert_eq!(split_into_chunks("", 200), vec![""]);
/// ```
pub fn split_into_chunks(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = trimmed(paragraph_regex().split(text));
    if chunks.len() == 1 {
        let items = trimmed(split_list_items(text).into_iter());
        chunks = if items.len() > 1 {
            items
        } else {
            trimmed(split_sentences(text).into_iter())
        };
    }

    let mut result: Vec<String> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let len = char_len(chunk);
        if len < SHORT_CHUNK_CHARS
            && let Some(last) = result.last_mut()
        {
            last.push(' ');
            last.push_str(chunk);
            continue;
        }
        if len > max_len {
            pack_sentences(chunk, max_len, &mut result);
            continue;
        }
        result.push(chunk.to_string());
    }

    if result.is_empty() {
        vec![text.to_string()]
    } else {
        result
    }
}

/// The delay-relevant length of a chunk: characters, not bytes.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn trimmed<'a>(pieces: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    pieces.map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Cut before every position where a list item starts, never at offset zero.
fn split_list_items(text: &str) -> Vec<&str> {
    let re = list_item_regex();
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.char_indices().skip(1) {
        if re.is_match(&text[idx..]) {
            pieces.push(&text[start..idx]);
            start = idx;
        }
    }
    pieces.push(&text[start..]);
    pieces
}

fn split_sentences(text: &str) -> Vec<&str> {
    let sentences: Vec<&str> = sentence_regex()
        .find_iter(text)
        .map(|m| m.as_str())
        .collect();
    if sentences.is_empty() {
        vec![text]
    } else {
        sentences
    }
}

/// Greedily pack the sentences of an oversized chunk into pieces of at most
/// `max_len` characters.  A single sentence longer than the limit stays whole.
fn pack_sentences(chunk: &str, max_len: usize, result: &mut Vec<String>) {
    let mut current = String::new();
    for sentence in split_sentences(chunk) {
        let sentence = sentence.trim();
        if !current.is_empty() && char_len(&current) + 1 + char_len(sentence) > max_len {
            push_nonblank(result, &current);
            current = sentence.to_string();
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(sentence);
        }
    }
    push_nonblank(result, &current);
}

fn push_nonblank(result: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        result.push(piece.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn plain_text_is_one_trimmed_chunk() {
        let chunks = split_into_chunks("   just some words without any stops   ", 200);
        assert_eq!(chunks, vec!["just some words without any stops"]);
    }

    #[test]
    fn empty_input_falls_back_to_itself() {
        assert_eq!(split_into_chunks("", 200), vec![""]);
        assert_eq!(split_into_chunks("   ", 200), vec!["   "]);
        assert_eq!(split_into_chunks("\n\n\n", 200), vec!["\n\n\n"]);
    }

    #[test]
    fn short_reply_is_a_single_chunk() {
        assert_eq!(split_into_chunks("Hi!", 200), vec!["Hi!"]);
    }

    #[test]
    fn paragraphs_become_bubbles() {
        let text = "The first paragraph is long enough to stand alone.\n\n\
                    The second paragraph is also long enough to stand alone.";
        assert_eq!(
            split_into_chunks(text, 200),
            vec![
                "The first paragraph is long enough to stand alone.",
                "The second paragraph is also long enough to stand alone.",
            ]
        );
    }

    #[test]
    fn short_paragraph_merges_into_previous() {
        let chunks = split_into_chunks("Hi there.\n\nHow can I help?", 200);
        assert_eq!(chunks, vec!["Hi there. How can I help?"]);
    }

    #[test]
    fn short_first_chunk_stays_first() {
        let text = "Sure!\n\nHere is the longer explanation that follows the greeting.";
        assert_eq!(
            split_into_chunks(text, 200),
            vec![
                "Sure!",
                "Here is the longer explanation that follows the greeting."
            ]
        );
    }

    #[test]
    fn numbered_list_splits_on_items() {
        let text = "You have a few options to consider:\n\
                    1. Restart the service and watch the logs\n\
                    2. Roll back to the previous release instead";
        assert_eq!(
            split_into_chunks(text, 200),
            vec![
                "You have a few options to consider:",
                "1. Restart the service and watch the logs",
                "2. Roll back to the previous release instead",
            ]
        );
    }

    #[test]
    fn bullets_split_on_items() {
        let text = "Things that usually help in this situation:\n\
                    - clearing the local cache directory entirely\n\
                    • checking that the token has not expired yet";
        assert_eq!(
            split_into_chunks(text, 200),
            vec![
                "Things that usually help in this situation:",
                "- clearing the local cache directory entirely",
                "• checking that the token has not expired yet",
            ]
        );
    }

    #[test]
    fn bold_numbered_items_split_without_newlines() {
        let text = "1. **Install** the command line tool from the registry \
                    2. **Configure** the webhook address in the options file";
        assert_eq!(
            split_into_chunks(text, 200),
            vec![
                "1. **Install** the command line tool from the registry",
                "2. **Configure** the webhook address in the options file",
            ]
        );
    }

    #[test]
    fn sentences_keep_their_terminators() {
        let text = "This first sentence is certainly long enough!!! \
                    Is the second sentence also long enough?? \
                    And a trailing fragment without a stop";
        assert_eq!(
            split_into_chunks(text, 200),
            vec![
                "This first sentence is certainly long enough!!!",
                "Is the second sentence also long enough??",
                "And a trailing fragment without a stop",
            ]
        );
    }

    #[test]
    fn short_sentences_collapse_together() {
        assert_eq!(
            split_into_chunks("Wait!!! Really?? Yes.", 200),
            vec!["Wait!!! Really?? Yes."]
        );
    }

    #[test]
    fn only_terminators_is_one_chunk() {
        assert_eq!(split_into_chunks("?!", 200), vec!["?!"]);
    }

    #[test]
    fn leading_terminators_are_kept() {
        let text = "...and then the story simply continues onward. It really does go on and on.";
        let chunks = split_into_chunks(text, 200);
        assert!(chunks[0].starts_with("...and then"), "{chunks:?}");
        assert_eq!(non_whitespace(&chunks.concat()), non_whitespace(text));
    }

    #[test]
    fn oversized_paragraph_is_packed_under_limit() {
        let intro = "This introduction paragraph is long enough to stand alone.";
        let body = (0..6)
            .map(|i| format!("Sentence number {i} explains one more useful detail."))
            .collect::<Vec<_>>()
            .join(" ");
        let text = format!("{intro}\n\n{body}");
        let chunks = split_into_chunks(&text, 120);
        assert_eq!(chunks[0], intro);
        assert!(chunks.len() >= 4, "{chunks:?}");
        for chunk in &chunks {
            assert!(char_len(chunk) <= 120, "{chunk:?} exceeds limit");
        }
        assert_eq!(non_whitespace(&chunks.concat()), non_whitespace(&text));
    }

    #[test]
    fn long_single_paragraph_respects_limit() {
        let text = (0..10)
            .map(|i| format!("Item {i} of the list deserves a full sentence here."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = split_into_chunks(&text, 80);
        assert_eq!(chunks.len(), 10);
        assert!(chunks.iter().all(|c| char_len(c) <= 80));
    }

    #[test]
    fn short_tail_merges_past_the_limit() {
        let sentence = "This sentence is exactly long enough to matter here.";
        let text = format!("{sentence} {sentence} Okay then.");
        let chunks = split_into_chunks(&text, 60);
        assert_eq!(
            chunks,
            vec![sentence.to_string(), format!("{sentence} Okay then.")]
        );
        // the merge of a short chunk ignores max_len
        assert_eq!(char_len(&chunks[1]), 63);
    }

    #[test]
    fn oversized_sentence_stays_whole() {
        let first = "An opening paragraph that is comfortably long enough.";
        let sentence = "word ".repeat(40);
        let text = format!("{first}\n\n{}", sentence.trim());
        let chunks = split_into_chunks(&text, 50);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], sentence.trim());
    }

    #[test]
    fn lengths_are_counted_in_characters() {
        let first = "A paragraph that is long enough to be placed first.";
        let accented = "é".repeat(SHORT_CHUNK_CHARS - 1);
        let text = format!("{first}\n\n{accented}");
        assert_eq!(
            split_into_chunks(&text, 200),
            vec![format!("{first} {accented}")]
        );
    }

    #[test]
    fn chunks_preserve_every_visible_character() {
        let samples = [
            "Hello there. General Kenobi!\n\nYou are a bold one.",
            "Steps:\n1. one two three four five six\n2. seven eight nine ten",
            "no stops at all but plenty of words to read through here",
            "Why? Because. Why not!!! Fine...",
        ];
        for sample in samples {
            let chunks = split_into_chunks(sample, 40);
            assert_eq!(
                non_whitespace(&chunks.concat()),
                non_whitespace(sample),
                "{sample:?} -> {chunks:?}"
            );
        }
    }
}
