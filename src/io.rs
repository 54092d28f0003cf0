use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use csv::WriterBuilder;
use flate2::read::MultiGzDecoder;
use log::{info, warn};
use noodles::fasta::{
    self as fasta,
    record::{Definition, Sequence},
    Record,
};

use crate::{
    error::{ConsensusError, Result},
    mergealign::{AlignedSequence, Alignment, GAP},
};

/// Lists the regular files of an alignment directory, sorted by file name.
pub fn list_alignment_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let unreadable = |source| ConsensusError::UnreadableDirectory {
        path: directory.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_file() {
            paths.push(path);
        } else {
            warn!("Skipping {path:?}, it is not a file");
        }
    }

    paths.sort_unstable();
    Ok(paths)
}

fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    let is_gzipped = path
        .file_name()
        .map(|v| v.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false);
    let file = File::open(path).map_err(|source| ConsensusError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(if is_gzipped {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

/// The full header line without the leading `>`.
fn header(record: &Record) -> String {
    let name = String::from_utf8_lossy(record.name());
    match record.description() {
        Some(description) => format!("{name} {}", String::from_utf8_lossy(description)),
        None => name.into_owned(),
    }
}

/// Reads the records of a FASTA file, which may be gzip compressed.
///
/// Fails if the file contains no records.
pub fn read_fasta(path: &Path) -> Result<Vec<AlignedSequence>> {
    let mut reader = fasta::io::Reader::new(open(path)?);
    let mut records = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|source| ConsensusError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(AlignedSequence::new(
            header(&record),
            record.sequence().as_ref().to_vec(),
        ));
    }

    if records.is_empty() {
        return Err(ConsensusError::EmptyFasta {
            path: path.to_path_buf(),
        });
    }

    Ok(records)
}

pub fn read_alignment(path: &Path) -> Result<Alignment> {
    info!("Loading alignment {path:?}");
    let records = read_fasta(path)?;
    Ok(Alignment::new(path.display().to_string(), records))
}

/// Reads a gold-standard alignment, where `.` is accepted as an alternative gap marker.
pub fn read_reference_alignment(path: &Path) -> Result<Alignment> {
    info!("Loading reference alignment {path:?}");
    let mut records = read_fasta(path)?;
    for record in &mut records {
        for character in &mut record.sequence {
            if *character == b'.' {
                *character = GAP;
            }
        }
    }

    Ok(Alignment::new(path.display().to_string(), records))
}

/// Renders the given records as FASTA, with each identifier as the full header line.
pub fn fasta_to_bytes(records: &[AlignedSequence]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut writer = fasta::io::Writer::new(&mut buffer);

    for record in records {
        let definition = Definition::new(record.id.as_str(), None);
        let sequence = Sequence::from(record.sequence.clone());
        writer.write_record(&Record::new(definition, sequence))?;
    }

    drop(writer);
    Ok(buffer)
}

/// Renders one score per line with the given number of decimal places.
pub fn scores_to_bytes(scores: &[f64], precision: usize) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    for score in scores {
        writer
            .write_record([format!("{score:.precision$}")])
            .map_err(std::io::Error::from)?;
    }

    writer
        .into_inner()
        .map_err(|error| ConsensusError::Io(error.into_error()))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Writes every output or none of them.
///
/// Each output is first written next to its target and only renamed into place once all writes succeeded.
pub fn write_outputs(outputs: &[(&Path, &[u8])]) -> Result<()> {
    let unwritable = |path: &Path, source| ConsensusError::UnwritableFile {
        path: path.to_path_buf(),
        source,
    };
    let discard = |staged: &[PathBuf]| {
        for path in staged {
            if let Err(error) = std::fs::remove_file(path) {
                warn!("Unable to remove {path:?}: {error}");
            }
        }
    };

    let mut staged = Vec::with_capacity(outputs.len());
    for &(path, contents) in outputs {
        info!("Writing {path:?}");
        let staging = staging_path(path);
        if let Err(source) = std::fs::write(&staging, contents) {
            discard(&staged[..]);
            return Err(unwritable(path, source));
        }
        staged.push(staging);
    }

    for (index, (&(path, _), staging)) in outputs.iter().zip(&staged).enumerate() {
        if let Err(source) = std::fs::rename(staging, path) {
            discard(&staged[index..]);
            return Err(unwritable(path, source));
        }
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{write::GzEncoder, Compression};

    use super::{testing::TestDirectory, *};
    use crate::error::ErrorKind;

    fn test_directory(name: &str) -> TestDirectory {
        TestDirectory::new(&format!("io-{name}"))
    }

    fn file_names(directory: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(directory)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn multi_line_records_are_concatenated() {
        let directory = test_directory("multi-line");
        let path = directory.join("a.fasta");
        std::fs::write(&path, ">s1 first\nAC-\nGT\n>s2\nA-CGT\n").unwrap();

        let records = read_fasta(&path).unwrap();
        assert_eq!(
            records,
            vec![
                AlignedSequence::new("s1 first", "AC-GT"),
                AlignedSequence::new("s2", "A-CGT"),
            ]
        );
    }

    #[test]
    fn gzipped_files_are_decompressed() {
        let directory = test_directory("gzip");
        let path = directory.join("a.fasta.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b">s1\nAC-GT\n").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let records = read_fasta(&path).unwrap();
        assert_eq!(records, vec![AlignedSequence::new("s1", "AC-GT")]);
    }

    #[test]
    fn empty_and_missing_files_are_input_errors() {
        let directory = test_directory("empty");
        let path = directory.join("empty.fasta");
        std::fs::write(&path, "").unwrap();

        assert_eq!(read_fasta(&path).unwrap_err().kind(), ErrorKind::Input);
        assert_eq!(
            read_fasta(&directory.join("missing.fasta"))
                .unwrap_err()
                .kind(),
            ErrorKind::Input
        );
    }

    #[test]
    fn directory_listing_is_sorted() {
        let directory = test_directory("listing");
        for name in ["c.fasta", "a.fasta", "b.fasta"] {
            std::fs::write(directory.join(name), ">s\nA\n").unwrap();
        }
        std::fs::create_dir(directory.join("nested")).unwrap();

        let names: Vec<_> = list_alignment_files(&directory)
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.fasta", "b.fasta", "c.fasta"]);

        let error = list_alignment_files(&directory.join("missing")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn reference_dots_are_gaps() {
        let directory = test_directory("reference");
        let path = directory.join("ref.fasta");
        std::fs::write(&path, ">s1\nAC.GT\n").unwrap();

        let alignment = read_reference_alignment(&path).unwrap();
        assert_eq!(alignment.records[0].sequence, b"AC-GT");
    }

    #[test]
    fn scores_use_fixed_precision() {
        let bytes = scores_to_bytes(&[1.0, 0.5, 2.0 / 3.0], 3).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "1.000\n0.500\n0.667\n");
    }

    #[test]
    fn fasta_output_can_be_read_back() {
        let records = vec![
            AlignedSequence::new("s1", "AC-GT"),
            AlignedSequence::new("s2", "A-CGT"),
        ];
        let bytes = fasta_to_bytes(&records).unwrap();
        assert_eq!(String::from_utf8(bytes.clone()).unwrap(), ">s1\nAC-GT\n>s2\nA-CGT\n");

        let directory = test_directory("round-trip");
        let path = directory.join("out.fasta");
        std::fs::write(&path, bytes).unwrap();
        assert_eq!(read_fasta(&path).unwrap(), records);
    }

    #[test]
    fn headers_are_written_back_unchanged() {
        let directory = test_directory("headers");
        let path = directory.join("a.fasta");
        std::fs::write(&path, ">s1 sample one\nAC-GT\n>s2\nA-CGT\n").unwrap();

        let records = read_fasta(&path).unwrap();
        let bytes = fasta_to_bytes(&records).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            ">s1 sample one\nAC-GT\n>s2\nA-CGT\n"
        );
    }

    #[test]
    fn outputs_are_written_together() {
        let directory = test_directory("outputs");
        let fasta = directory.join("consensus.fasta");
        let scores = directory.join("scores.txt");
        std::fs::write(&scores, "stale\n").unwrap();

        write_outputs(&[
            (fasta.as_path(), b">s\nA\n".as_slice()),
            (scores.as_path(), b"1.000\n".as_slice()),
        ])
        .unwrap();

        assert_eq!(std::fs::read_to_string(&fasta).unwrap(), ">s\nA\n");
        assert_eq!(std::fs::read_to_string(&scores).unwrap(), "1.000\n");
        assert_eq!(file_names(&directory), vec!["consensus.fasta", "scores.txt"]);
    }

    #[test]
    fn failed_write_leaves_no_output() {
        let directory = test_directory("failed-write");
        let fasta = directory.join("consensus.fasta");
        let scores = directory.join("missing").join("scores.txt");

        let error = write_outputs(&[
            (fasta.as_path(), b">s\nA\n".as_slice()),
            (scores.as_path(), b"1.000\n".as_slice()),
        ])
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Output);
        assert!(!fasta.exists());
        assert!(file_names(&directory).is_empty());
    }

    #[test]
    fn test_directories_are_removed_on_drop() {
        let directory = test_directory("drop");
        let path = directory.to_path_buf();
        std::fs::write(path.join("a.fasta"), ">s\nA\n").unwrap();

        drop(directory);
        assert!(!path.exists());
    }
}
