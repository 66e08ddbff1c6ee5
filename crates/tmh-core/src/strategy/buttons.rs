use crate::domain::{Button, RemoteMessage};

/// Forward-arrow glyphs; substring match also covers the emoji forms (`▶️`, `➡️`).
const ARROW_TOKENS: [&str; 2] = ["▶", "➡"];

/// Callback data of the non-interactive "page x of y" button.
const PAGE_INDICATOR: &[u8] = b"page_info";

/// Find the next-page control on the newest incoming message that has buttons.
///
/// An arrow button wins over one labelled with `current_page + 1`. Buttons on
/// older messages are ignored even if they are still visible.
pub fn find_next_page_button(
    messages: &[RemoteMessage],
    current_page: u32,
) -> Option<(&RemoteMessage, &Button)> {
    let holder = messages
        .iter()
        .filter(|m| !m.outgoing && m.has_buttons())
        .max_by_key(|m| m.id)?;

    let next_number = (current_page + 1).to_string();
    let mut arrow = None;
    let mut numbered = None;

    for button in holder.buttons.iter().flatten() {
        let Some(data) = button.data.as_deref() else {
            continue;
        };
        if data.is_empty() || data == PAGE_INDICATOR {
            continue;
        }

        if ARROW_TOKENS.iter().any(|t| button.text.contains(t)) {
            arrow = Some(button);
        } else if button.text.contains(&next_number) {
            numbered = Some(button);
        }
    }

    arrow.or(numbered).map(|b| (holder, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{photo, text, with_buttons};

    #[test]
    fn arrow_beats_page_number() {
        let msgs = vec![with_buttons(
            text(5),
            &[("◀️", "prev"), ("2", "p2"), ("▶️", "next")],
        )];
        let (holder, b) = find_next_page_button(&msgs, 1).unwrap();
        assert_eq!(holder.id, 5);
        assert_eq!(b.data.as_deref(), Some(&b"next"[..]));
    }

    #[test]
    fn falls_back_to_next_page_number() {
        let msgs = vec![with_buttons(text(5), &[("1", "p1"), ("· 2 ·", "p2"), ("3", "p3")])];
        let (_, b) = find_next_page_button(&msgs, 1).unwrap();
        assert_eq!(b.text, "· 2 ·");

        let (_, b) = find_next_page_button(&msgs, 2).unwrap();
        assert_eq!(b.text, "3");
    }

    #[test]
    fn bare_and_emoji_arrows_both_qualify() {
        let msgs = vec![with_buttons(text(5), &[("Next ➡", "n")])];
        assert!(find_next_page_button(&msgs, 1).is_some());
    }

    #[test]
    fn page_indicator_and_url_buttons_are_excluded() {
        let mut msg = with_buttons(text(5), &[("2/9", "page_info")]);
        msg.buttons[0].push(Button {
            text: "▶️ site".to_string(),
            data: None,
        });
        assert!(find_next_page_button(&[msg], 1).is_none());
    }

    #[test]
    fn only_newest_message_with_buttons_counts() {
        let older = with_buttons(photo(3), &[("▶️", "old-next")]);
        let newer = with_buttons(text(8), &[("Menu", "menu")]);
        let plain = photo(9);
        assert!(find_next_page_button(&[older, newer, plain], 1).is_none());
    }

    #[test]
    fn outgoing_messages_are_ignored() {
        let mut own = with_buttons(text(9), &[("▶️", "mine")]);
        own.outgoing = true;
        let theirs = with_buttons(text(4), &[("▶️", "theirs")]);
        let msgs = [own, theirs];
        let (holder, _) = find_next_page_button(&msgs, 1).unwrap();
        assert_eq!(holder.id, 4);
    }

    #[test]
    fn no_buttons_means_done() {
        assert!(find_next_page_button(&[photo(1), text(2)], 1).is_none());
    }
}
