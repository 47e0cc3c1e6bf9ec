use std::path::{Path, PathBuf};

pub fn get_lemma_data_path<P: AsRef<Path>>(path: P) -> PathBuf {
    path.as_ref().join("lemma_data.json")
}

pub fn get_disk_table_path<P: AsRef<Path>>(path: P) -> PathBuf {
    path.as_ref().join("lemma_data.tbl")
}

pub fn get_disk_table_metadata_path<P: AsRef<Path>>(path: P) -> PathBuf {
    path.as_ref().join("lemma_data.sidx")
}

// either artifact is enough, disk mode derives the table from the json
pub fn has_lemma_data<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    get_lemma_data_path(path).exists()
        || (get_disk_table_path(path).exists() && get_disk_table_metadata_path(path).exists())
}
