use std::process::ExitCode;

use burn_pt_archive::{ArchiveError, LoadArgs, PtArchive, logger::init_log};
use log::LevelFilter;

/// Lists the entries of a PyTorch archive and the order its tensors would be loaded in.
///
/// Usage: `pt-inspect <file.pt> [root]`
fn main() -> ExitCode {
    init_log(LevelFilter::Debug).ok();

    let Some(file) = std::env::args().nth(1) else {
        log::error!("No input file provided (usage: pt-inspect <file.pt> [root])");
        return ExitCode::FAILURE;
    };

    let mut args = LoadArgs::from(file);
    if let Some(root) = std::env::args().nth(2) {
        args = args.with_root(&root);
    }

    match inspect(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn inspect(args: LoadArgs) -> Result<(), ArchiveError> {
    let archive = PtArchive::open_with(args)?;

    log::info!(
        "{} entries, tensors under '{}/'",
        archive.entries().len(),
        archive.root()
    );
    for entry in archive.entries() {
        log::debug!(
            "{} (method {}, {} bytes at offset {})",
            entry.name(),
            entry.compression_method(),
            entry.uncompressed_size(),
            entry.data_offset()
        );
    }

    log::info!(
        "{} tensors ordered with the {} strategy",
        archive.tensor_order().len(),
        archive.strategy()
    );
    for (position, entry) in archive.tensor_entries().enumerate() {
        log::info!(
            "#{position}: {} ({} bytes)",
            entry.name(),
            entry.uncompressed_size()
        );
    }

    Ok(())
}
