use rstest::rstest;
use sorter_hardware::FileEeprom;
use sorter_hardware::eeprom::ERASED;
use sorter_traits::ByteStore;

#[test]
fn missing_image_reads_blank() {
    let dir = tempfile::tempdir().unwrap();
    let mut e = FileEeprom::open(dir.path().join("stats.bin")).unwrap();
    for addr in 0..4 {
        assert_eq!(e.read_byte(addr).unwrap(), ERASED);
    }
    assert!(!e.path().exists(), "opening must not create the file");
}

#[test]
fn writes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.bin");
    {
        let mut e = FileEeprom::open(&path).unwrap();
        e.write_byte(0x00, 3).unwrap();
        e.write_byte(0x02, 12).unwrap();
    }
    let mut e = FileEeprom::open(&path).unwrap();
    assert_eq!(e.read_byte(0x00).unwrap(), 3);
    assert_eq!(e.read_byte(0x01).unwrap(), ERASED);
    assert_eq!(e.read_byte(0x02).unwrap(), 12);
    assert!(!path.with_extension("new").exists(), "temp image is renamed away");
}

#[rstest]
#[case(256)]
#[case(u16::MAX)]
fn out_of_range_addresses_fail(#[case] addr: u16) {
    let dir = tempfile::tempdir().unwrap();
    let mut e = FileEeprom::open(dir.path().join("stats.bin")).unwrap();
    let err = e.write_byte(addr, 1).unwrap_err();
    assert!(format!("{err}").contains("out of range"));
    assert!(e.read_byte(addr).is_err());
}

#[test]
fn short_image_is_padded_with_erased_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.bin");
    std::fs::write(&path, [1u8, 2]).unwrap();
    let mut e = FileEeprom::open(&path).unwrap();
    assert_eq!(e.read_byte(1).unwrap(), 2);
    assert_eq!(e.read_byte(2).unwrap(), ERASED);
}

#[test]
fn failed_write_leaves_the_cached_byte_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    std::fs::create_dir(&store_dir).unwrap();
    let path = store_dir.join("stats.bin");

    let mut e = FileEeprom::open(&path).unwrap();
    e.write_byte(0x03, 0).unwrap();

    std::fs::remove_dir_all(&store_dir).unwrap();
    assert!(e.write_byte(0x03, 1).is_err());
    assert_eq!(e.read_byte(0x03).unwrap(), 0, "cache must match the durable image");

    // A retry after the directory returns really reaches the disk.
    std::fs::create_dir(&store_dir).unwrap();
    e.write_byte(0x03, 1).unwrap();
    let mut reopened = FileEeprom::open(&path).unwrap();
    assert_eq!(reopened.read_byte(0x03).unwrap(), 1);
}
