use std::{path::PathBuf, process::ExitCode};

use accuracy::AccuracyReport;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use compact_genome::{
    implementation::alphabets::{
        dna_alphabet::DnaAlphabet, dna_alphabet_or_n::DnaAlphabetOrN,
        dna_iupac_nucleic_acid_alphabet::DnaIupacNucleicAcidAlphabet,
        famsa_amino_acid_alphabet::FamsaAminoAcidAlphabet,
        iupac_amino_acid_alphabet::IupacAminoAcidAlphabet, rna_alphabet::RnaAlphabet,
        rna_alphabet_or_n::RnaAlphabetOrN,
        rna_iupac_nucleic_acid_alphabet::RnaIupacNucleicAcidAlphabet,
    },
    interface::alphabet::{Alphabet, AlphabetCharacter},
};
use csv::Writer;
use error::ConsensusError;
use log::{error, info, warn, LevelFilter};
use mergealign::{merge_alignments, ReferenceSequences};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

mod accuracy;
mod error;
mod io;
mod mergealign;

#[derive(Parser)]
#[command(about = "Merges alternative alignments of the same sequences into a consensus alignment")]
struct Cli {
    /// The minimum importance of log messages to output.
    #[clap(long, short = 'l', default_value = "info")]
    log_level: LevelFilter,

    /// A directory containing one alignment per file in fasta format.
    ///
    /// Files are processed in the order of their names.
    #[clap(long, short = 'a')]
    alignments: Option<PathBuf>,

    /// Further alignment files, processed after the files of the alignment directory.
    #[clap(long, short = 'i')]
    input: Vec<PathBuf>,

    /// Where to write the consensus alignment in fasta format.
    #[clap(long, short = 'f')]
    fasta: Option<PathBuf>,

    /// Where to write the confidence score of each consensus column, one per line.
    #[clap(long, short = 's')]
    score: Option<PathBuf>,

    /// Only output consensus columns with a confidence score above this value.
    ///
    /// Must be greater than zero and at most one.
    #[clap(long, short = 't')]
    threshold: Option<f64>,

    /// The number of decimal places of the written confidence scores.
    #[clap(long, default_value = "3")]
    score_precision: usize,

    /// The alphabet the residues of the input alignments must belong to.
    #[clap(long, default_value = "any")]
    alphabet: InputAlphabet,

    /// A reference alignment to compute the pairwise accuracy of the written consensus against.
    #[clap(long, short = 'r')]
    reference: Option<PathBuf>,

    /// Where to write the accuracy against the reference alignment in csv format.
    #[clap(long, requires = "reference")]
    accuracy: Option<PathBuf>,
}

#[derive(Debug, Clone, Eq, PartialEq, ValueEnum)]
enum InputAlphabet {
    /// Accept any residue.
    Any,
    Dna,
    DnaN,
    Rna,
    RnaN,
    DnaIupac,
    RnaIupac,
    /// The IUPAC amino acid alphabet.
    IupacAminoAcid,
    /// The FAMSA amino acid alphabet.
    FamsaAminoAcid,
}

type AlphabetValidator = fn(&ReferenceSequences, &str) -> Result<(), ConsensusError>;

impl InputAlphabet {
    fn validator(&self) -> AlphabetValidator {
        match self {
            Self::Any => |_, _| Ok(()),
            Self::Dna => validate_alphabet::<DnaAlphabet>,
            Self::DnaN => validate_alphabet::<DnaAlphabetOrN>,
            Self::Rna => validate_alphabet::<RnaAlphabet>,
            Self::RnaN => validate_alphabet::<RnaAlphabetOrN>,
            Self::DnaIupac => validate_alphabet::<DnaIupacNucleicAcidAlphabet>,
            Self::RnaIupac => validate_alphabet::<RnaIupacNucleicAcidAlphabet>,
            Self::IupacAminoAcid => validate_alphabet::<IupacAminoAcidAlphabet>,
            Self::FamsaAminoAcid => validate_alphabet::<FamsaAminoAcidAlphabet>,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = TermLogger::init(
        cli.log_level,
        Default::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Unable to initialise logging: {error}");
        return ExitCode::FAILURE;
    }

    info!("Logging initialised");

    match execute(cli) {
        Ok(()) => {
            info!("Terminating");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!("{error:#}");
            ExitCode::from(exit_code(&error))
        }
    }
}

/// Picks the exit status from the first [`ConsensusError`] in the error chain.
fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ConsensusError>())
        .map(|error| error.kind().exit_code())
        .unwrap_or(1)
}

fn execute(cli: Cli) -> Result<()> {
    if let Some(threshold) = cli.threshold {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConsensusError::InvalidThreshold(threshold).into());
        }
    }
    if cli.alignments.is_none() && cli.input.is_empty() {
        return Err(ConsensusError::MissingAlignments.into());
    }
    if cli.fasta.is_none() && cli.score.is_none() && cli.accuracy.is_none() {
        warn!("No output file given, the consensus is only computed");
    }

    let mut paths = Vec::new();
    if let Some(directory) = &cli.alignments {
        info!("Listing alignments in {directory:?}");
        paths.extend(io::list_alignment_files(directory)?);
    }
    paths.extend(cli.input.iter().cloned());
    if paths.is_empty() {
        let source = cli
            .alignments
            .as_ref()
            .map(|directory| format!("{directory:?}"))
            .unwrap_or_else(|| "the input files".to_string());
        return Err(ConsensusError::NoAlignments(source).into());
    }

    let alignments = paths
        .iter()
        .map(|path| io::read_alignment(path))
        .collect::<Result<Vec<_>, _>>()?;
    info!("Loaded {} alignments", alignments.len());

    let references = ReferenceSequences::from_alignment(&alignments[0]);
    let alphabet_name = format!("{:?}", cli.alphabet);
    (cli.alphabet.validator())(&references, &alphabet_name)?;

    let consensus = merge_alignments(&alignments)?;
    let records = match cli.threshold {
        Some(threshold) => {
            let records = consensus.filter_columns(threshold);
            info!(
                "Keeping {} of {} columns with a score above {threshold}",
                records
                    .first()
                    .map(|record| record.sequence.len())
                    .unwrap_or(0),
                consensus.column_amount()
            );
            records
        }
        None => consensus.records.clone(),
    };

    // Everything is rendered before the first file is written.
    let fasta = io::fasta_to_bytes(&records)?;
    let scores = io::scores_to_bytes(&consensus.scores, cli.score_precision)?;
    let accuracy = cli
        .reference
        .as_ref()
        .map(|path| -> Result<_> {
            let reference = io::read_reference_alignment(path)?;
            let report = AccuracyReport::compare(&records, &reference.records);
            info!("Accuracy against {path:?}: {report}");
            accuracy_to_bytes(&report)
        })
        .transpose()?;

    let mut outputs = Vec::new();
    if let Some(path) = &cli.fasta {
        outputs.push((path.as_path(), fasta.as_slice()));
    }
    if let Some(path) = &cli.score {
        outputs.push((path.as_path(), scores.as_slice()));
    }
    if let (Some(path), Some(accuracy)) = (&cli.accuracy, &accuracy) {
        outputs.push((path.as_path(), accuracy.as_slice()));
    }
    io::write_outputs(&outputs)?;

    Ok(())
}

fn accuracy_to_bytes(report: &AccuracyReport) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["precision", "recall", "f_score"])?;
    writer.write_record([
        format!("{:.4}", report.precision()),
        format!("{:.4}", report.recall()),
        format!("{:.4}", report.f_score()),
    ])?;

    writer
        .into_inner()
        .map_err(|error| error.into_error())
        .context("Error rendering accuracy csv")
}

/// Checks that every reference residue is a character of the given alphabet.
fn validate_alphabet<AlphabetType: Alphabet>(
    references: &ReferenceSequences,
    alphabet_name: &str,
) -> Result<(), ConsensusError> {
    let mut valid_characters = vec![false; usize::from(u8::MAX) + 1];
    for index in 0..usize::from(AlphabetType::SIZE) {
        let Ok(index) = index.try_into() else {
            continue;
        };

        if let Ok(character) = AlphabetType::CharacterType::from_index(index) {
            let character: char = character.into();
            if character.is_ascii() {
                valid_characters[usize::from(character as u8)] = true;
            }
        }
    }

    for reference in references.iter() {
        if let Some(residue) = reference
            .sequence
            .iter()
            .find(|residue| !valid_characters[usize::from(**residue)])
        {
            return Err(ConsensusError::InvalidResidue {
                id: reference.id.clone(),
                residue: char::from(*residue),
                alphabet: alphabet_name.to_string(),
            });
        }
    }

    Ok(())
}
