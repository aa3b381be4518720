//! Prompt tags and the ordered tag set built during derivation

use std::fmt;

/// A single descriptive prompt token.
///
/// `emphasis` wraps the rendered text in that many pairs of parentheses,
/// which diffusion front-ends read as attention weighting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    text: String,
    emphasis: u8,
}

impl Tag {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: 0,
        }
    }

    #[must_use]
    pub fn emphasized(text: impl Into<String>, emphasis: u8) -> Self {
        Self {
            text: text.into(),
            emphasis,
        }
    }

    /// Bare tag text without emphasis markers
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = usize::from(self.emphasis);
        write!(f, "{}{}{}", "(".repeat(depth), self.text, ")".repeat(depth))
    }
}

impl From<&str> for Tag {
    fn from(text: &str) -> Self {
        Tag::new(text)
    }
}

impl From<String> for Tag {
    fn from(text: String) -> Self {
        Tag::new(text)
    }
}

/// Ordered positive and negative tags. Insertion order is kept as-is since it
/// determines the rendered prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    positive: Vec<Tag>,
    negative: Vec<Tag>,
}

impl TagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend_positive<I, T>(&mut self, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.positive.extend(tags.into_iter().map(Into::into));
    }

    pub fn extend_negative<I, T>(&mut self, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.negative.extend(tags.into_iter().map(Into::into));
    }

    #[must_use]
    pub fn positive(&self) -> &[Tag] {
        &self.positive
    }

    #[must_use]
    pub fn negative(&self) -> &[Tag] {
        &self.negative
    }

    /// Join both sequences with ", " into prompt strings
    #[must_use]
    pub fn render(&self) -> Prompt {
        Prompt {
            positive: join_tags(&self.positive),
            negative: join_tags(&self.negative),
        }
    }
}

fn join_tags(tags: &[Tag]) -> String {
    tags.iter()
        .filter(|tag| !tag.is_blank())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rendered prompt and negative prompt handed to the image generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub positive: String,
    pub negative: String,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "prompt: {}", self.positive)?;
        write!(f, "negative: {}", self.negative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emphasis_rendering() {
        assert_eq!(Tag::new("night").to_string(), "night");
        assert_eq!(Tag::emphasized("starry sky", 1).to_string(), "(starry sky)");
        assert_eq!(Tag::emphasized("full moon", 2).to_string(), "((full moon))");
    }

    #[test]
    fn test_text_is_bare_and_rendering_is_emphasized() {
        let mut tags = TagSet::new();
        tags.extend_positive([Tag::emphasized("full moon", 2)]);
        assert_eq!(tags.positive()[0].text(), "full moon");
        assert_eq!(tags.render().positive, "((full moon))");
    }

    #[test]
    fn test_render_keeps_order_and_skips_blank_tags() {
        let mut tags = TagSet::new();
        tags.extend_positive(["outdoors", "", "scenery"]);
        tags.extend_positive([Tag::emphasized("crescent moon", 2)]);
        tags.extend_negative(["snow"]);

        let prompt = tags.render();
        assert_eq!(prompt.positive, "outdoors, scenery, ((crescent moon))");
        assert_eq!(prompt.negative, "snow");
    }

    #[test]
    fn test_empty_set_renders_empty_strings() {
        let prompt = TagSet::new().render();
        assert!(prompt.positive.is_empty());
        assert!(prompt.negative.is_empty());
    }
}
