use log::info;
use std::path::Path;
use walkdir::WalkDir;

// Files with the given extension in the folder, descending at most
// `max_depth` levels (1 being the folder itself), in natural order.
// A missing folder has no files.
pub fn files(
    path: &Path,
    max_depth: usize,
    extension: &str,
) -> Result<Vec<Box<Path>>, walkdir::Error> {
    if !path.is_dir() {
        info!("No such directory {}, skipping.", path.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(&path)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
    {
        let entry = entry?;
        let matches = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| e.eq_ignore_ascii_case(extension));
        if matches {
            files.push(entry.into_path().into_boxed_path());
        }
    }
    files.sort_by(|a, b| {
        alphanumeric_sort::compare_str(&a.to_string_lossy(), &b.to_string_lossy())
    });
    info!("Found {} {} file(s) in {}.", files.len(), extension, path.display());
    Ok(files)
}
