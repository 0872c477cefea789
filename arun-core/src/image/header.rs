use crate::acode::Aword;
use crate::version::Version;

/// On-disk header layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderShape {
    /// Before 3.0 alpha 5: no `ifids`, no `prompt`.
    PreAlpha5,
    /// Before 3.0 beta 2: no `prompt`.
    PreBeta2,
    Current,
}

impl HeaderShape {
    pub fn for_version(version: Version) -> Self {
        if version.is_pre_alpha5() {
            HeaderShape::PreAlpha5
        } else if version.is_pre_beta2() {
            HeaderShape::PreBeta2
        } else {
            HeaderShape::Current
        }
    }

    /// Size in words; the first word after the header is where the checksum starts.
    pub fn words(self) -> usize {
        match self {
            HeaderShape::PreAlpha5 => Header::FIELD_NAMES.len() - 2,
            HeaderShape::PreBeta2 => Header::FIELD_NAMES.len() - 1,
            HeaderShape::Current => Header::FIELD_NAMES.len(),
        }
    }
}

macro_rules! header {
    ($($field:ident),* $(,)?) => {
        /// Normalized image header. Older shapes are widened, missing fields are 0.
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct Header {
            $(pub $field: Aword,)*
        }

        impl Header {
            pub const FIELD_NAMES: &'static [&'static str] = &[$(stringify!($field)),*];

            /// Build from host-order header words; words past the end of `words` read as 0.
            pub fn from_words(words: &[Aword]) -> Self {
                let mut it = words.iter().copied();
                Self {
                    $($field: it.next().unwrap_or(0),)*
                }
            }

            pub fn to_words(&self) -> Vec<Aword> {
                vec![$(self.$field),*]
            }
        }
    };
}

header! {
    tag,
    version,
    uid,
    size,
    pack,
    string_offset,
    page_length,
    page_width,
    debug,
    class_table_address,
    class_max,
    entity_class_id,
    thing_class_id,
    object_class_id,
    location_class_id,
    actor_class_id,
    literal_class_id,
    integer_class_id,
    string_class_id,
    instance_table_address,
    instance_max,
    the_hero,
    container_table_address,
    container_max,
    script_table_address,
    script_max,
    event_table_address,
    event_max,
    syntax_table_address,
    parameter_map_address,
    syntax_max,
    dictionary,
    verb_table_address,
    rule_table_address,
    message_table_address,
    attributes_area_size,
    max_parameters,
    string_init_table,
    set_init_table,
    start,
    maximum_score,
    scores,
    score_count,
    source_file_table,
    source_line_table,
    freq,
    acdcrc,
    txtcrc,
    ifids,
    prompt,
}

impl Header {
    /// Header of a given shape; fields the shape lacks are zeroed.
    pub fn from_shape(words: &[Aword], shape: HeaderShape) -> Self {
        let len = shape.words().min(words.len());
        Self::from_words(&words[..len])
    }

    /// Name/value pairs in on-disk order, for dumps.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Aword)> {
        Self::FIELD_NAMES.iter().copied().zip(self.to_words())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acode::HEADER_WORDS;
    use pretty_assertions::assert_eq;

    #[test]
    fn shapes() {
        assert_eq!(HeaderShape::Current.words(), HEADER_WORDS);
        assert_eq!(HeaderShape::PreBeta2.words(), 49);
        assert_eq!(HeaderShape::PreAlpha5.words(), 48);
    }

    #[test]
    fn old_shapes_synthesize_missing_fields() {
        let words: Vec<Aword> = (1..=50).collect();
        let hdr = Header::from_shape(&words, HeaderShape::PreAlpha5);
        assert_eq!(hdr.txtcrc, 48);
        assert_eq!(hdr.ifids, 0);
        assert_eq!(hdr.prompt, 0);

        let hdr = Header::from_shape(&words, HeaderShape::Current);
        assert_eq!(hdr.prompt, 50);
        assert_eq!(hdr.the_hero, 22);
    }
}
