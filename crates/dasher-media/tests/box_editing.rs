//! Box removal scenarios on synthetic init segments.

use bytes::{BufMut, BytesMut};
use dasher_media::mp4::{locate, remove, remove_from_file, BoxPath, BoxTree, BoxType};

fn leaf(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u32(8 + payload.len() as u32);
    buf.put_slice(kind);
    buf.put_slice(payload);
    buf.to_vec()
}

fn container(kind: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = children.concat();
    let mut buf = BytesMut::new();
    buf.put_u32(8 + body.len() as u32);
    buf.put_slice(kind);
    buf.put_slice(&body);
    buf.to_vec()
}

fn extended_container(kind: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = children.concat();
    let mut buf = BytesMut::new();
    buf.put_u32(1);
    buf.put_slice(kind);
    buf.put_u64(16 + body.len() as u64);
    buf.put_slice(&body);
    buf.to_vec()
}

/// ftyp + moov { mvhd, trak { tkhd, senc }, trak { tkhd, senc }, pssh, pssh, free }
fn encrypted_init() -> Vec<u8> {
    let trak = |id: u8| {
        container(
            b"trak",
            &[leaf(b"tkhd", &[id; 12]), leaf(b"senc", &[0xE0 + id; 10])],
        )
    };
    let moov = container(
        b"moov",
        &[
            leaf(b"mvhd", &[0; 20]),
            trak(1),
            trak(2),
            leaf(b"pssh", &[0xAA; 40]),
            leaf(b"pssh", &[0xBB; 24]),
            leaf(b"free", &[]),
        ],
    );
    [leaf(b"ftyp", b"iso6dash"), moov].concat()
}

fn count(data: &[u8], path: &str) -> usize {
    let tree = BoxTree::parse(data).unwrap();
    locate(&tree, &path.parse().unwrap()).len()
}

#[test]
fn test_wildcard_removes_every_pssh() {
    let data = encrypted_init();
    let path: BoxPath = "moov/pssh[*]".parse().unwrap();

    let (out, removed) = remove(&data, &path).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(out.len(), data.len() - (48 + 32));

    assert_eq!(count(&out, "moov/pssh[*]"), 0);
    assert_eq!(count(&out, "moov/trak[*]/senc"), 2);
    BoxTree::parse(&out).unwrap().check_sizes().unwrap();
}

#[test]
fn test_bare_segment_removes_first_only() {
    let data = encrypted_init();
    let (out, removed) = remove(&data, &"moov/trak/senc".parse().unwrap()).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(out.len(), data.len() - 18);

    let tree = BoxTree::parse(&out).unwrap();
    tree.check_sizes().unwrap();
    let traks = locate(&tree, &"moov/trak[*]".parse().unwrap());
    assert!(tree.find_child(traks[0].node, BoxType::SENC).is_none());
    let second = tree.find_child(traks[1].node, BoxType::SENC).unwrap();
    assert_eq!(tree.payload(&out, second), &[0xE2; 10]);
}

#[test]
fn test_index_selector() {
    let data = encrypted_init();
    let (out, removed) = remove(&data, &"moov/trak[1]/senc".parse().unwrap()).unwrap();
    assert_eq!(removed, 1);
    let tree = BoxTree::parse(&out).unwrap();
    let traks = locate(&tree, &"moov/trak[*]".parse().unwrap());
    assert!(tree.find_child(traks[0].node, BoxType::SENC).is_some());
    assert!(tree.find_child(traks[1].node, BoxType::SENC).is_none());

    let (_, removed) = remove(&data, &"moov/trak[7]/senc".parse().unwrap()).unwrap();
    assert_eq!(removed, 0);
}

#[test]
fn test_missing_path_returns_input_unchanged() {
    let data = encrypted_init();
    for path in ["moof/traf/senc", "moov/udta", "moov/trak/pssh[*]", "mdat"] {
        let (out, removed) = remove(&data, &path.parse().unwrap()).unwrap();
        assert_eq!(removed, 0, "{}", path);
        assert_eq!(out, data, "{}", path);
    }
}

#[test]
fn test_extended_size_ancestor_is_patched() {
    let moov = extended_container(
        b"moov",
        &[leaf(b"mvhd", &[0; 8]), leaf(b"pssh", &[1; 30]), leaf(b"pssh", &[2; 30])],
    );
    let data = [leaf(b"ftyp", b"iso6"), moov].concat();

    let (out, removed) = remove(&data, &"moov/pssh[*]".parse().unwrap()).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(out.len(), data.len() - 76);

    let tree = BoxTree::parse(&out).unwrap();
    tree.check_sizes().unwrap();
    let moov = tree.node(tree.roots()[1]);
    assert_eq!(moov.header.header_size, 16);
    assert_eq!(moov.size(), 16 + 16);
}

#[test]
fn test_malformed_input_is_format_error() {
    let mut data = encrypted_init();
    data.truncate(data.len() - 5);
    let err = remove(&data, &"moov/pssh[*]".parse().unwrap()).unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_file_edit_in_place_and_to_copy() {
    let dir = tempfile::tempdir().unwrap();
    let init = dir.path().join("v1_i.mp4");
    let nopssh = dir.path().join("v1_i_nopssh.mp4");
    std::fs::write(&init, encrypted_init()).unwrap();

    let removed = remove_from_file(&init, &nopssh, &"moov/pssh[*]".parse().unwrap()).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(std::fs::read(&init).unwrap(), encrypted_init());
    assert_eq!(count(&std::fs::read(&nopssh).unwrap(), "moov/pssh[*]"), 0);

    let removed = remove_from_file(&init, &init, &"moov/trak/senc".parse().unwrap()).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(count(&std::fs::read(&init).unwrap(), "moov/trak[*]/senc"), 1);
}

#[test]
fn test_file_edit_missing_input_is_no_match() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent_i.mp4");
    let out = dir.path().join("out.mp4");
    let removed = remove_from_file(&missing, &out, &"moov/pssh[*]".parse().unwrap()).unwrap();
    assert_eq!(removed, 0);
    assert!(!out.exists());
}

#[test]
fn test_strip_with_terminated_udta() {
    let mut udta = container(b"udta", &[leaf(b"name", b"clip")]);
    udta.extend_from_slice(&[0; 4]);
    udta[3] += 4;
    let moov = container(
        b"moov",
        &[leaf(b"mvhd", &[0; 20]), udta, leaf(b"pssh", &[0xAA; 40])],
    );
    let data = [leaf(b"ftyp", b"iso6dash"), moov].concat();

    let (out, removed) = remove(&data, &"moov/pssh[*]".parse().unwrap()).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(count(&out, "moov/udta/name"), 1);
    BoxTree::parse(&out).unwrap().check_sizes().unwrap();
}
