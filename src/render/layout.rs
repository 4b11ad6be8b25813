use ab_glyph::{Font, FontVec, PxScale, ScaleFont};

/// Anything that occupies horizontal space on a line
pub trait Measure {
    fn width(&self) -> u32;
}

/// A run of text drawn with one font at one size
#[derive(Clone)]
pub struct Term<'f> {
    pub text: String,
    pub font: &'f FontVec,
    pub scale: PxScale,
    pub width: u32,
}

impl<'f> Term<'f> {
    pub fn new(text: impl Into<String>, font: &'f FontVec, scale: PxScale) -> Self {
        let text = text.into();
        let width = measure(font, scale, &text);
        Self { text, font, scale, width }
    }
}

impl Measure for Term<'_> {
    fn width(&self) -> u32 {
        self.width
    }
}

/// Advance width of `text`, kerning included
pub fn measure(font: &FontVec, scale: PxScale, text: &str) -> u32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0f32;
    let mut previous = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(previous) = previous {
            width += scaled.kern(previous, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }

    width.round().max(0.0) as u32
}

/// PIL-style point size to the pixel scale ab_glyph draws with
pub fn font_scale(font: &FontVec, size: f32) -> PxScale {
    font.pt_to_px_scale(size).unwrap_or_else(|| PxScale::from(size))
}

/// Split text on single spaces, keeping an explicit space after every word
pub fn split_words(text: &str) -> Vec<String> {
    text.split(' ')
        .flat_map(|word| [word.to_string(), " ".to_string()])
        .collect()
}

/// Greedily wrap terms into lines no wider than `max_width`.
///
/// A term that is wider than `max_width` on its own still gets a line.
pub fn terms_to_lines<T: Measure>(terms: Vec<T>, max_width: u32) -> Vec<Vec<T>> {
    let mut lines = Vec::new();
    let mut line: Vec<T> = Vec::new();
    let mut width = 0u32;

    for term in terms {
        let term_width = term.width();
        if width + term_width > max_width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            width = 0;
        }
        width += term_width;
        line.push(term);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Total width of a line
pub fn line_width<T: Measure>(line: &[T]) -> u32 {
    line.iter().map(Measure::width).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Block(&'static str, u32);

    impl Measure for Block {
        fn width(&self) -> u32 {
            self.1
        }
    }

    fn names(lines: &[Vec<Block>]) -> Vec<Vec<&'static str>> {
        lines.iter().map(|l| l.iter().map(|b| b.0).collect()).collect()
    }

    #[test]
    fn test_terms_wrap_at_max_width() {
        let terms = vec![Block("a", 40), Block("b", 40), Block("c", 30), Block("d", 50)];
        let lines = terms_to_lines(terms, 100);

        assert_eq!(names(&lines), vec![vec!["a", "b"], vec!["c", "d"]]);
        assert_eq!(line_width(&lines[0]), 80);
    }

    #[test]
    fn test_exact_fit_stays_on_line() {
        let lines = terms_to_lines(vec![Block("a", 60), Block("b", 40), Block("c", 1)], 100);
        assert_eq!(names(&lines), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn test_oversized_term_gets_own_line() {
        let lines = terms_to_lines(vec![Block("huge", 500), Block("a", 10)], 100);
        assert_eq!(names(&lines), vec![vec!["huge"], vec!["a"]]);

        let lines = terms_to_lines(vec![Block("a", 10), Block("huge", 500)], 100);
        assert_eq!(names(&lines), vec![vec!["a"], vec!["huge"]]);
    }

    #[test]
    fn test_no_terms_no_lines() {
        assert!(terms_to_lines(Vec::<Block>::new(), 100).is_empty());
    }

    #[test]
    fn test_split_words_interleaves_spaces() {
        assert_eq!(split_words("In the name"), vec!["In", " ", "the", " ", "name", " "]);
    }
}
