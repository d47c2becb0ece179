use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::warn;

use crate::models::Page;

/// Give up after this many XML errors in a row; a sticky error would
/// otherwise loop forever without producing events.
const MAX_CONSECUTIVE_ERRORS: u32 = 16;

/// Streaming decoder over the Wikipedia export XML.
///
/// Yields one [`Page`] per `<page>` element. Only the first `<id>` (the
/// page id, not the revision id), the first redirect target, and the first
/// revision's text and timestamp are retained. Unknown elements are
/// ignored. Decode errors are logged and the decoder skips forward to the
/// next `<page>`; end of stream terminates the sequence.
pub struct PageReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> PageReader<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        // Wikipedia dumps occasionally contain stray markup inside text
        // nodes; do not abort the stream on mismatched end tags.
        reader.config_mut().check_end_names = false;
        Self {
            reader,
            buf: Vec::with_capacity(1024),
        }
    }
}

impl<R: BufRead> Iterator for PageReader<R> {
    type Item = Page;

    fn next(&mut self) -> Option<Self::Item> {
        // state
        let mut current_id: Option<i64> = None;
        let mut current_title: Option<String> = None;
        let mut current_ns: Option<i32> = None;
        let mut current_text: Option<String> = None;
        let mut current_timestamp: Option<String> = None;
        let mut redirect_target: Option<String> = None;

        // flags
        let mut in_title = false;
        let mut in_id = false;
        // The page <id> must win even when its text fails to parse; the
        // next <id> is the revision id.
        let mut id_seen = false;
        let mut in_ns = false;
        let mut in_text = false;
        let mut in_timestamp = false;
        let mut errors = 0u32;

        loop {
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => {
                    errors = 0;
                    match e.name().as_ref() {
                        b"page" => {
                            // a fresh page; drop any state left over from a
                            // previous decode error
                            current_id = None;
                            current_title = None;
                            current_ns = None;
                            current_text = None;
                            current_timestamp = None;
                            redirect_target = None;
                            id_seen = false;
                        }
                        b"title" => in_title = true,
                        b"id" if !id_seen => {
                            in_id = true;
                            id_seen = true;
                        }
                        b"ns" => in_ns = true,
                        b"timestamp" if current_timestamp.is_none() => in_timestamp = true,
                        b"text" if current_text.is_none() => in_text = true,
                        b"redirect" => {
                            if redirect_target.is_none() {
                                if let Ok(Some(attr)) = e.try_get_attribute("title") {
                                    redirect_target =
                                        Some(String::from_utf8_lossy(&attr.value).to_string());
                                }
                            }
                        }
                        _ => (),
                    }
                }

                Ok(Event::Empty(e)) => {
                    errors = 0;
                    if e.name().as_ref() == b"redirect" && redirect_target.is_none() {
                        if let Ok(Some(attr)) = e.try_get_attribute("title") {
                            redirect_target =
                                Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                }

                Ok(Event::Text(e)) => {
                    errors = 0;
                    if in_title {
                        if let Ok(s) = e.unescape() {
                            current_title = Some(s.into_owned());
                        }
                    } else if in_id {
                        let s = String::from_utf8_lossy(&e).trim().to_string();
                        current_id = s.parse::<i64>().ok();
                    } else if in_ns {
                        let s = String::from_utf8_lossy(&e).trim().to_string();
                        current_ns = s.parse::<i32>().ok();
                    } else if in_timestamp {
                        if let Ok(s) = e.unescape() {
                            current_timestamp = Some(s.into_owned());
                        }
                    } else if in_text {
                        if let Ok(s) = e.unescape() {
                            current_text = Some(s.into_owned());
                        }
                    }
                }

                Ok(Event::End(e)) => {
                    errors = 0;
                    match e.name().as_ref() {
                        b"title" => in_title = false,
                        b"id" => in_id = false,
                        b"ns" => in_ns = false,
                        b"timestamp" => in_timestamp = false,
                        b"text" => in_text = false,
                        b"page" => {
                            if let (Some(id), Some(title)) = (current_id, current_title.take()) {
                                return Some(Page {
                                    id,
                                    title,
                                    ns: current_ns.unwrap_or(0),
                                    redirect: redirect_target.take(),
                                    text: current_text.take(),
                                    timestamp: current_timestamp.take(),
                                });
                            }
                        }
                        _ => (),
                    }
                }

                Ok(Event::Eof) => return None,

                Err(e) => {
                    errors += 1;
                    warn!(
                        position = self.reader.buffer_position(),
                        error = %e,
                        "XML decode error, resuming at next page"
                    );
                    if errors >= MAX_CONSECUTIVE_ERRORS {
                        warn!("too many consecutive XML errors, stopping");
                        return None;
                    }
                    // Abandon the partially decoded page; the next
                    // `<page>` start resets all state.
                    in_title = false;
                    in_id = false;
                    in_ns = false;
                    in_text = false;
                    in_timestamp = false;
                }

                _ => (),
            }
            // reuse memory
            self.buf.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pages(xml: &str) -> Vec<Page> {
        PageReader::new(Cursor::new(xml.as_bytes().to_vec())).collect()
    }

    #[test]
    fn parse_single_article() {
        let xml = r#"<mediawiki>
            <page>
                <title>Anarchism</title>
                <ns>0</ns>
                <id>12</id>
                <revision>
                    <id>100</id>
                    <timestamp>2024-01-15T10:30:00Z</timestamp>
                    <text>Anarchism is a political philosophy.</text>
                </revision>
            </page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, 12);
        assert_eq!(got[0].title, "Anarchism");
        assert_eq!(got[0].ns, 0);
        assert!(got[0].redirect.is_none());
        assert_eq!(
            got[0].text.as_deref(),
            Some("Anarchism is a political philosophy.")
        );
        assert_eq!(got[0].timestamp.as_deref(), Some("2024-01-15T10:30:00Z"));
    }

    #[test]
    fn first_id_tag_is_page_id() {
        let xml = r#"<mediawiki>
            <page>
                <title>Test</title>
                <id>42</id>
                <revision>
                    <id>99999</id>
                    <text>Content</text>
                </revision>
            </page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got[0].id, 42);
    }

    #[test]
    fn first_revision_text_wins() {
        let xml = r#"<mediawiki>
            <page>
                <title>Test</title>
                <id>1</id>
                <revision><id>10</id><text>first revision</text></revision>
                <revision><id>11</id><text>second revision</text></revision>
            </page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got[0].text.as_deref(), Some("first revision"));
    }

    #[test]
    fn redirect_attribute_is_captured() {
        let xml = r#"<mediawiki>
            <page>
                <title>AccessibleComputing</title>
                <ns>0</ns>
                <id>10</id>
                <redirect title="Computer accessibility" />
                <revision>
                    <id>200</id>
                    <text>#REDIRECT [[Computer accessibility]]</text>
                </revision>
            </page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].redirect.as_deref(), Some("Computer accessibility"));
    }

    #[test]
    fn first_redirect_target_wins() {
        let xml = r#"<mediawiki>
            <page>
                <title>Doubly redirected</title>
                <id>2</id>
                <redirect title="First target" />
                <redirect title="Second target" />
            </page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got[0].redirect.as_deref(), Some("First target"));
    }

    #[test]
    fn namespace_is_parsed() {
        let xml = r#"<mediawiki>
            <page>
                <title>Talk:Anarchism</title>
                <ns>1</ns>
                <id>13</id>
            </page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got[0].ns, 1);
    }

    #[test]
    fn missing_namespace_defaults_to_zero() {
        let xml = r#"<mediawiki>
            <page>
                <title>Bare page</title>
                <id>7</id>
            </page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got[0].ns, 0);
    }

    #[test]
    fn parse_multiple_pages() {
        let xml = r#"<mediawiki>
            <page><title>A</title><id>1</id></page>
            <page><title>B</title><id>2</id></page>
            <page><title>C</title><id>3</id></page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].title, "A");
        assert_eq!(got[1].title, "B");
        assert_eq!(got[2].title, "C");
    }

    #[test]
    fn parse_empty_dump() {
        assert!(pages("<mediawiki></mediawiki>").is_empty());
    }

    #[test]
    fn entities_are_unescaped() {
        let xml = r#"<mediawiki>
            <page>
                <title>AT&amp;T</title>
                <id>1</id>
            </page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got[0].title, "AT&T");
    }

    #[test]
    fn unicode_content_survives() {
        let xml = r#"<mediawiki>
            <page>
                <title>日本語</title>
                <id>1</id>
                <revision><text>日本語の記事</text></revision>
            </page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got[0].title, "日本語");
        assert_eq!(got[0].text.as_deref(), Some("日本語の記事"));
    }

    #[test]
    fn malformed_page_id_does_not_take_revision_id() {
        let xml = r#"<mediawiki>
            <page>
                <title>Broken id</title>
                <id>notanumber</id>
                <revision><id>999</id><text>body</text></revision>
            </page>
            <page><title>Good</title><id>5</id></page>
        </mediawiki>"#;

        // The broken page is dropped rather than resurfacing under its
        // revision id.
        let got = pages(xml);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, 5);
        assert_eq!(got[0].title, "Good");
    }

    #[test]
    fn pages_without_id_are_dropped() {
        let xml = r#"<mediawiki>
            <page><title>No id</title></page>
            <page><title>Has id</title><id>5</id></page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, 5);
    }

    #[test]
    fn stray_end_tag_does_not_end_the_stream() {
        let xml = r#"<mediawiki>
            <page><title>A</title><id>1</id></page>
            </bogus>
            <page><title>B</title><id>2</id></page>
        </mediawiki>"#;

        let got = pages(xml);
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].title, "B");
    }
}
