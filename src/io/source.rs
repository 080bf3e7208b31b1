use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use tracing::debug;
use zip::ZipArchive;
use crate::io::{decode, Image, ImageLoader};
use crate::types::sample::Sample;

/// Opens the image source at `path`: a `.zip` archive or a directory.
pub fn open_images(path: &Path) -> Result<Arc<dyn ImageLoader>> {
    let is_zip = path.extension()
        .map(|extension| extension.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    if is_zip {
        Ok(Arc::new(ZipImages::open(path)?))
    } else if path.is_dir() {
        Ok(Arc::new(DirectoryImages::new(path)))
    } else {
        Err(anyhow!("Image source '{}' is neither a directory nor a zip archive.", path.display()))
    }
}

/// Images stored as files under a root directory.
pub struct DirectoryImages {
    root: PathBuf,
}

impl DirectoryImages {
    pub fn new<P: AsRef<Path>>(root: P) -> DirectoryImages {
        DirectoryImages { root: root.as_ref().to_path_buf() }
    }
}

impl ImageLoader for DirectoryImages {
    fn load(&self, sample: &Sample) -> Result<Image> {
        let path = self.root.join(sample.path());
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read image '{}'", path.display()))?;
        decode(&bytes).with_context(|| format!("image '{}'", path.display()))
    }
}

/// Images stored as entries of a zip archive.
///
/// Reading an entry needs exclusive access to the archive, so concurrent loads take turns.
pub struct ZipImages {
    path: PathBuf,
    archive: Mutex<ZipArchive<File>>,
}

impl ZipImages {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ZipImages> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("failed to open archive '{}'", path.display()))?;
        let archive = ZipArchive::new(file)
            .with_context(|| format!("failed to read archive '{}'", path.display()))?;
        debug!(archive = %path.display(), entries = archive.len(), "opened image archive");
        Ok(ZipImages { path, archive: Mutex::new(archive) })
    }

    fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        let name = name.trim_start_matches("./");
        let mut archive = self.archive.lock();
        let mut entry = archive.by_name(name)
            .with_context(|| format!("'{}' is not in archive '{}'", name, self.path.display()))?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl ImageLoader for ZipImages {
    fn load(&self, sample: &Sample) -> Result<Image> {
        let bytes = self.read_entry(sample.path())?;
        decode(&bytes).with_context(|| format!("image '{}' in '{}'", sample.path(), self.path.display()))
    }
}

/// Already decoded images keyed by sample path.
#[derive(Default)]
pub struct MemoryImages {
    images: HashMap<String, Image>,
}

impl MemoryImages {
    pub fn insert(&mut self, path: &str, image: Image) {
        self.images.insert(path.to_string(), image);
    }
}

impl ImageLoader for MemoryImages {
    fn load(&self, sample: &Sample) -> Result<Image> {
        self.images.get(sample.path())
            .cloned()
            .ok_or_else(|| anyhow!("No image stored for '{}'.", sample.path()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;
    use ndarray::Array3;
    use tempdir::TempDir;
    use zip::write::FileOptions;
    use zip::ZipWriter;
    use crate::io::save;
    use crate::io::source::{open_images, DirectoryImages, ZipImages};
    use crate::io::ImageLoader;
    use crate::types::sample::Sample;

    fn write_png(dir: &TempDir, name: &str, value: u8) -> Vec<u8> {
        let path = dir.path().join(name);
        save(Array3::<u8>::from_elem((3, 2, 3), value).view(), &path).unwrap();
        std::fs::read(path).unwrap()
    }

    #[test]
    fn test_directory_images() {
        let dir = TempDir::new("test_directory_images").unwrap();
        std::fs::create_dir(dir.path().join("img")).unwrap();
        write_png(&dir, "img/a.png", 42);

        let images = DirectoryImages::new(dir.path());
        let image = images.load(&Sample::new("1", "A", "c", "img/a.png")).unwrap();
        assert_eq!((3, 2, 3), image.dim());
        assert_eq!(42, image[[2, 1, 0]]);

        assert!(images.load(&Sample::new("2", "A", "c", "img/b.png")).is_err());
        assert!(open_images(dir.path()).is_ok());
        assert!(open_images(&dir.path().join("nowhere")).is_err());
    }

    #[test]
    fn test_zip_images() {
        let dir = TempDir::new("test_zip_images").unwrap();
        let bytes = write_png(&dir, "a.png", 7);

        let archive_path = dir.path().join("images.zip");
        let mut writer = ZipWriter::new(File::create(&archive_path).unwrap());
        writer.start_file("img/a.png", FileOptions::default()).unwrap();
        writer.write_all(&bytes).unwrap();
        writer.start_file("img/broken.png", FileOptions::default()).unwrap();
        writer.write_all(b"garbage").unwrap();
        writer.finish().unwrap();

        let images = ZipImages::open(&archive_path).unwrap();
        let image = images.load(&Sample::new("1", "A", "c", "./img/a.png")).unwrap();
        assert_eq!(7, image[[0, 0, 2]]);
        assert!(images.load(&Sample::new("2", "A", "c", "img/missing.png")).is_err());
        assert!(images.load(&Sample::new("3", "A", "c", "img/broken.png")).is_err());

        let loader = open_images(&archive_path).unwrap();
        assert!(loader.load(&Sample::new("1", "A", "c", "img/a.png")).is_ok());
    }
}
