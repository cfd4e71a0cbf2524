//! Card splitting

/// Split a deck file into cards: one card per paragraph.
///
/// Paragraphs are separated by lines holding only whitespace; each card is
/// trimmed and empty ones are dropped.
pub fn split_into_cards(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n");
    let mut cards = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if !line.trim().is_empty() {
            current.push(line);
        } else if !current.is_empty() {
            push_card(&mut cards, &current);
            current.clear();
        }
    }
    push_card(&mut cards, &current);
    cards
}

fn push_card(cards: &mut Vec<String>, lines: &[&str]) {
    let card = lines.join("\n");
    let card = card.trim();
    if !card.is_empty() {
        cards.push(card.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_blank_lines() {
        let text = "First card\nstill first\n\nSecond card\r\n\r\n\r\nThird card\n";
        assert_eq!(
            split_into_cards(text),
            vec!["First card\nstill first", "Second card", "Third card"]
        );
    }

    #[test]
    fn test_whitespace_only_separator_lines() {
        let text = "  one  \n \t \ntwo\n\n\n   \n\nthree";
        assert_eq!(split_into_cards(text), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_empty_and_blank_text() {
        assert!(split_into_cards("").is_empty());
        assert!(split_into_cards("\n\n  \n").is_empty());
    }
}
