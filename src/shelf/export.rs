use crate::error::{Result, ShelfError};
use crate::registry::LibraryRegistry;
use crate::store::collection::CollectionStore;
use crate::store::StorageBackend;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const ARCHIVE_ROOT: &str = "shelf";

/// Writes a `.tar.gz` holding a library (default: the current one) and the
/// DNF pool, each as structured and tabular files.
///
/// `dest` may be a directory, in which case a timestamped file name is used.
/// Returns the path written.
pub fn export_archive<B: StorageBackend>(
    registry: &LibraryRegistry<B>,
    library_id: Option<&str>,
    dest: &Path,
) -> Result<PathBuf> {
    let id = library_id.unwrap_or_else(|| registry.current_id());
    let library = registry
        .library(id)
        .ok_or_else(|| ShelfError::LibraryNotFound(id.to_string()))?;

    let path = if dest.is_dir() {
        let stamp = Utc::now().format("%Y-%m-%d_%H%M%S");
        dest.join(format!("shelf-{}-{}.tar.gz", id, stamp))
    } else {
        dest.to_path_buf()
    };

    let file = File::create(&path).map_err(ShelfError::Io)?;
    write_archive(file, &[library, registry.dnf()])?;
    log::info!("Exported library '{}' to {}", id, path.display());
    Ok(path)
}

fn write_archive<W: Write, B: StorageBackend>(
    writer: W,
    stores: &[&CollectionStore<B>],
) -> Result<()> {
    let enc = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(enc);

    for store in stores {
        let key = store.key();
        let entries = [
            (key.structured_filename(), store.structured_export()?),
            (key.tabular_filename(), store.tabular_export()?),
        ];
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(Utc::now().timestamp().max(0) as u64);
            header.set_cksum();

            tar.append_data(
                &mut header,
                format!("{}/{}", ARCHIVE_ROOT, name),
                content.as_bytes(),
            )
            .map_err(ShelfError::Io)?;
        }
    }

    tar.into_inner()
        .and_then(|enc| enc.finish())
        .map_err(ShelfError::Io)?;
    Ok(())
}
