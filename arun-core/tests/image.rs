use arun_core::acode::{Aword, WordClass};
use arun_core::image::header::{Header, HeaderShape};
use arun_core::testing::*;
use arun_core::version::Version;
use arun_core::{Options, OptionsBuilder, Program, VmError};
use pretty_assertions::assert_eq;

fn small_game() -> ImageBuilder {
    let mut b = ImageBuilder::new();
    let kitchen = b.location("kitchen");
    b.hero_at(kitchen);
    let lamp = b.object("lamp", kitchen);
    b.word("lamp", WordClass::Noun, lamp);
    b.describe(kitchen, "A small kitchen.");
    b
}

#[test]
fn loads_an_assembled_image() -> anyhow::Result<()> {
    let program = small_game().program(&Options::default())?;
    let header = program.header();

    assert_eq!(&header.tag.to_ne_bytes(), b"ALAN");
    assert_eq!(header.instance_max, 4);
    assert_eq!(header.the_hero, HERO as Aword);
    assert_eq!(program.instance(3).map(|i| i.parent), Some(LOCATION));
    assert_eq!(program.instance(4).map(|i| i.initial_location), Some(3));
    assert_eq!(
        program.class_chain(OBJECT).map(|(id, _)| id).collect::<Vec<_>>(),
        vec![OBJECT, THING, ENTITY]
    );
    assert!(program.instance(5).is_none());
    Ok(())
}

#[test]
fn strings_keep_their_byte_order() -> anyhow::Result<()> {
    let program = small_game().program(&Options::default())?;
    assert_eq!(program.word_string(0).as_deref(), Some("lamp"));

    let entry = program.dictionary_entry(0).map(|e| e.string).unwrap_or(0) as usize;
    assert!(!program.reversed_words().contains(&entry));
    assert!(!program.reversed_words().contains(&0));
    if cfg!(target_endian = "little") {
        assert!(program.reversed_words().contains(&1));
    }
    Ok(())
}

#[test]
fn checksum_covers_the_words_after_the_header() -> anyhow::Result<()> {
    let mut file = small_game().build();
    let at = file.windows(5).position(|w| w == b"lamp\0").unwrap_or(0);
    assert!(at > HeaderShape::Current.words() * 4);
    file[at] = b'L';

    assert!(matches!(
        Program::from_bytes(file.clone(), &Options::default()),
        Err(VmError::Checksum { .. })
    ));

    let ignoring = OptionsBuilder::new().with_ignore_errors(true).get();
    let mut program = Program::from_bytes(file, &ignoring)?;
    assert_eq!(program.take_warnings().len(), 1);
    assert_eq!(program.word_string(0).as_deref(), Some("Lamp"));
    assert!(program.take_warnings().is_empty());
    Ok(())
}

#[test]
fn the_text_area_is_not_checksummed() -> anyhow::Result<()> {
    let mut file = small_game().build();
    let at = file.windows(6).rposition(|w| w == b"kitche").unwrap_or(0);
    file[at] = b'K';
    let mut program = Program::from_bytes(file, &Options::default())?;
    assert!(program.take_warnings().is_empty());
    Ok(())
}

#[test]
fn rejects_foreign_and_short_files() {
    let options = Options::default();
    assert!(matches!(
        Program::from_bytes(b"GIF89a..".to_vec(), &options),
        Err(VmError::NotAnAlanFile)
    ));

    let mut file = small_game().build();
    file.truncate(HeaderShape::Current.words() * 4 + 8);
    assert!(matches!(Program::from_bytes(file, &options), Err(VmError::ShortRead)));
}

#[test]
fn version_mismatch_needs_ignore_errors() -> anyhow::Result<()> {
    let old = || small_game().with_version(Version::new(2, 8, 1, 0));
    assert!(matches!(
        Program::from_bytes(old().build(), &Options::default()),
        Err(VmError::IncompatibleVersion { .. })
    ));

    let ignoring = OptionsBuilder::new().with_ignore_errors(true).get();
    let mut program = old().program(&ignoring)?;
    assert_eq!(program.version(), Version::new(2, 8, 1, 0));
    assert_eq!(program.take_warnings().len(), 1);
    Ok(())
}

#[test]
fn pre_beta2_images_have_no_prompt() -> anyhow::Result<()> {
    let mut b = small_game().with_version(Version::new(3, 0, 1, b'b'));
    b.prompt(&[]);
    let program = b.program(&Options::default())?;

    assert_eq!(HeaderShape::for_version(program.version()), HeaderShape::PreBeta2);
    assert_eq!(program.header().prompt, 0);
    assert_eq!(program.word_string(0).as_deref(), Some("lamp"));
    Ok(())
}

#[test]
fn packed_text_is_decoded() -> anyhow::Result<()> {
    let mut b = ImageBuilder::packed();
    let kitchen = b.location("kitchen");
    b.hero_at(kitchen);
    let (first, first_len) = b.text("It's a small kitchen, with a stove!");
    let (second, second_len) = b.text("Cafe au lait.");
    let file = b.build();
    assert!(!file.windows(5).any(|w| w == b"small"));

    let program = Program::from_bytes(file, &Options::default())?;
    assert_ne!(program.header().pack, 0);
    assert_eq!(program.text(first as Aword, first_len as Aword)?, "It's a small kitchen, with a stove!");
    assert_eq!(program.text(second as Aword, second_len as Aword)?, "Cafe au lait.");
    Ok(())
}

#[test]
fn packed_images_need_a_frequency_table() {
    let mut b = ImageBuilder::new();
    let kitchen = b.location("kitchen");
    b.hero_at(kitchen);
    let mut file = b.build();
    let pack = Header::FIELD_NAMES.iter().position(|&name| name == "pack").unwrap_or(0);
    file[pack * 4 + 3] = 1;
    assert!(matches!(Program::from_bytes(file, &Options::default()), Err(VmError::EncodedText)));
}
