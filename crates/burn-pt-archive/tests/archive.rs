use std::fs::File;
use std::io::Write;
use std::path::Path;

use burn_pt_archive::apply::{F32Slot, StorageDType, TensorDestination, TensorKind, load_into};
use burn_pt_archive::{ArchiveError, LoadArgs, OrderStrategy, PtArchive, Stage};
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn stored() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

fn write_archive(path: &Path, entries: &[(&str, Vec<u8>, SimpleFileOptions)], comment: &str) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, data, options) in entries {
        zip.start_file(*name, *options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.set_comment(comment);
    zip.finish().unwrap();
}

fn binunicode(value: &str) -> Vec<u8> {
    let mut bytes = vec![b'X'];
    bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
    bytes.extend_from_slice(value.as_bytes());
    bytes
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn test_sequential_archive_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.pt");

    let weight = f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let bias = f32_bytes(&[0.5, -0.5]);
    let aligned = stored().with_alignment(64);
    write_archive(
        &path,
        &[
            ("model/data.pkl", b"\x80\x02}q\x00.".to_vec(), stored()),
            ("model/data/1", bias.clone(), aligned),
            ("model/data/0", weight.clone(), aligned),
            ("model/version", b"3\n".to_vec(), stored()),
        ],
        "",
    );

    let mut archive = PtArchive::open(&path).unwrap();

    assert_eq!(archive.root(), "model");
    assert_eq!(archive.strategy(), OrderStrategy::SequentialIndex);
    for entry in archive.tensor_entries() {
        assert_eq!(entry.data_offset() % 64, 0);
    }

    assert_eq!(archive.next_tensor().unwrap(), weight);
    assert_eq!(archive.next_tensor().unwrap(), bias);
    assert!(matches!(
        archive.next_tensor(),
        Err(ArchiveError::EndOfStream { consumed: 2 })
    ));
}

#[test]
fn test_token_ordered_archive_with_comment() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("yolo.pt");

    let mut descriptor = b"\x80\x02}q\x00(".to_vec();
    for key in ["94105", "94001", "94333"] {
        descriptor.extend(binunicode("storage"));
        descriptor.extend_from_slice(b"ctorch\nHalfStorage\n");
        descriptor.extend(binunicode(key));
        descriptor.extend(binunicode("cpu"));
        descriptor.extend_from_slice(b"K\x10tQ");
    }
    descriptor.extend_from_slice(b"u.");

    write_archive(
        &path,
        &[
            ("archive/data.pkl", descriptor, stored()),
            ("archive/data/94001", b"second".to_vec(), stored()),
            ("archive/data/94105", b"first".to_vec(), stored()),
            ("archive/data/94333", b"third".to_vec(), stored()),
        ],
        "saved by a test, with a comment the trailer scan has to skip",
    );

    let mut archive = PtArchive::open_with(LoadArgs::new(path)).unwrap();

    assert_eq!(archive.strategy(), OrderStrategy::LengthPrefixedToken);
    assert_eq!(archive.stream().len(), 3);
    assert_eq!(archive.next_tensor().unwrap(), b"first");
    assert_eq!(archive.next_tensor().unwrap(), b"second");
    assert_eq!(archive.next_tensor().unwrap(), b"third");
}

#[test]
fn test_deflated_tensor_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("deflated.pt");

    write_archive(
        &path,
        &[
            ("archive/data.pkl", b".".to_vec(), stored()),
            (
                "archive/data/0",
                vec![0u8; 512],
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            ),
        ],
        "",
    );

    let mut archive = PtArchive::open(&path).unwrap();
    assert_eq!(archive.entries().len(), 2);

    for _ in 0..2 {
        let err = archive.next_tensor().unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::UnsupportedCompression {
                stage: Stage::StreamRead,
                method: 8,
                ..
            }
        ));
        assert_eq!(archive.stream().position(), 0);
    }
}

#[test]
fn test_missing_trailer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.pt");
    std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

    let err = PtArchive::open(&path).err().unwrap();

    assert!(matches!(
        err,
        ArchiveError::Format {
            stage: Stage::TrailerScan,
            ..
        }
    ));
}

#[test]
fn test_missing_descriptor() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no-descriptor.pt");
    write_archive(
        &path,
        &[("archive/data/140213", b"tensor".to_vec(), stored())],
        "",
    );

    let err = PtArchive::open(&path).err().unwrap();

    assert_eq!(err.stage(), Stage::OrderResolve);
    assert!(err.to_string().contains("no root descriptor"));
}

#[test]
fn test_load_into_destinations() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("conv.pt");

    let mut descriptor = Vec::new();
    descriptor.extend(binunicode("7002"));
    descriptor.extend(binunicode("7001"));
    write_archive(
        &path,
        &[
            ("archive/data.pkl", descriptor, stored()),
            ("archive/data/7001", f32_bytes(&[0.0, 1.0]), stored()),
            ("archive/data/7002", f32_bytes(&[9.0]), stored()),
        ],
        "",
    );

    let mut archive = PtArchive::open(&path).unwrap();
    let mut weight = [0.0f32; 1];
    let mut running_mean = [0.0f32; 2];
    let mut weight_slot = F32Slot::new(&mut weight, StorageDType::F32, TensorKind::Parameter);
    let mut mean_slot = F32Slot::new(&mut running_mean, StorageDType::F32, TensorKind::Buffer);

    let summary = load_into(
        &mut archive,
        [
            &mut weight_slot as &mut dyn TensorDestination,
            &mut mean_slot as &mut dyn TensorDestination,
        ],
    )
    .unwrap();

    assert_eq!((summary.parameters, summary.buffers, summary.unused), (1, 1, 0));
    assert_eq!(weight, [9.0]);
    assert_eq!(running_mean, [0.0, 1.0]);
}
