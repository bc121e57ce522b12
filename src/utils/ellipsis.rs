use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;

pub trait Ellipsis {
    /// Truncate to at most `len` extended grapheme clusters, appending `...` when
    /// anything was cut. Newlines are flattened so the result fits on one log line.
    fn ellipsis(&self, len: usize) -> Cow<'_, str>;
}

impl Ellipsis for str {
    fn ellipsis(&self, len: usize) -> Cow<'_, str> {
        let flat: Cow<'_, str> = if self.contains('\n') {
            Cow::Owned(self.replace('\n', " "))
        } else {
            Cow::Borrowed(self)
        };
        if flat.graphemes(true).nth(len).is_none() {
            return flat;
        }
        if len == 0 {
            return Cow::Borrowed("");
        }
        let mut truncated: String = flat.graphemes(true).take(len).collect();
        truncated.push_str("...");
        Cow::Owned(truncated)
    }
}
