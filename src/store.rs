use std::error::Error;
use std::fs;
use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

pub fn sha256<T: Serialize>(data: &T) -> String {
    let serialized = serde_json::to_string(data).expect("Failed to serialize the key");
    crypto_hash::hex_digest(crypto_hash::Algorithm::SHA256, serialized.as_bytes())
}

#[derive(Serialize, Deserialize)]
struct SaveState {
    state: String,
    mistakes: u32,
}

/// Persistent play progress, one JSON file per level. The index key is the
/// exact pristine level text, hashed to a file name; the value is the level
/// text with the current display state plus the mistake counter.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open<P: Into<PathBuf>>(dir: P) -> Store {
        Store { dir: dir.into() }
    }

    fn path_of(&self, level: &str) -> PathBuf {
        let mut path = self.dir.clone();
        path.push(sha256(&level));
        path
    }

    pub fn get(&self, level: &str) -> Result<Option<(String, u32)>, Box<dyn Error>> {
        let path = self.path_of(level);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(error) => match error.kind() {
                ErrorKind::NotFound => return Ok(None),
                _ => return Err(format!("Error while opening save: {}", error).into()),
            },
        };
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let save: SaveState = serde_json::from_str(&contents)?;
        Ok(Some((save.state, save.mistakes)))
    }

    pub fn put(&self, level: &str, state: &str, mistakes: u32) -> Result<(), Box<dyn Error>> {
        fs::create_dir_all(&self.dir)?;
        let save = SaveState {
            state: state.to_string(),
            mistakes,
        };
        let json = serde_json::to_string(&save)?;
        // Write to a tmp name first and rename atomically, so an interrupted
        // write never corrupts an existing save.
        let mut tmppath = self.dir.clone();
        tmppath.push("tmp");
        {
            let mut file = File::create(&tmppath)?;
            file.write_all(json.as_bytes())?;
        }
        fs::rename(tmppath, self.path_of(level))?;
        Ok(())
    }

    pub fn delete(&self, level: &str) -> Result<(), Box<dyn Error>> {
        match fs::remove_file(self.path_of(level)) {
            Ok(()) => Ok(()),
            Err(error) => match error.kind() {
                ErrorKind::NotFound => Ok(()),
                _ => Err(format!("Error while clearing save: {}", error).into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use std::time::UNIX_EPOCH;

    fn scratch_store(tag: &str) -> Store {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let mut dir = std::env::temp_dir();
        dir.push(format!("hexkit-store-{}-{}", tag, stamp));
        Store::open(dir)
    }

    #[test]
    pub fn test_missing_level_is_none() {
        let store = scratch_store("missing");
        assert!(store.get("never stored").unwrap().is_none());
    }

    #[test]
    pub fn test_put_get_round_trip() {
        let store = scratch_store("roundtrip");
        let level = "Hexcells level v1\nsome\nlevel\n\n\ntext";
        let state = "Hexcells level v1\nsome\nlevel\n\n\ntext with progress";
        store.put(level, state, 3).unwrap();
        let (got_state, got_mistakes) = store.get(level).unwrap().expect("stored");
        assert_eq!(got_state, state);
        assert_eq!(got_mistakes, 3);
        // Overwrites keep the latest state
        store.put(level, state, 4).unwrap();
        assert_eq!(store.get(level).unwrap().expect("stored").1, 4);
    }

    #[test]
    pub fn test_progress_restore_through_the_store() {
        use codec::EmitOptions;
        use coords::Coord;
        use grid::Kind;
        use scene::Outcome;
        use scene::Scene;

        let mut lines = vec![
            "Hexcells level v1".to_string(),
            "store test".to_string(),
            "tester".to_string(),
            String::new(),
            String::new(),
        ];
        for y in 0..33 {
            let mut row = vec![".."; 33];
            if y == 16 {
                row[16] = "x.";
                row[18] = "o.";
            }
            lines.push(row.concat());
        }
        let text = lines.join("\n");

        let mut scene = Scene::load_text(&text).unwrap();
        let (pristine, _) = scene.save_text(EmitOptions::default());
        assert_eq!(scene.reveal(&Coord::new(16, 16), Kind::Empty), Outcome::Mistake);
        assert_eq!(scene.reveal(&Coord::new(16, 16), Kind::Full), Outcome::Correct);
        let (progress, _) = scene.save_text(EmitOptions {
            padding: false,
            display: true,
        });

        let store = scratch_store("progress");
        store.put(&pristine, &progress, scene.mistakes()).unwrap();

        let (state, mistakes) = store.get(&pristine).unwrap().expect("stored");
        let mut restored = Scene::load_text(&state).unwrap();
        restored.set_mistakes(mistakes);
        assert_eq!(restored.mistakes(), 1);
        assert_eq!(restored.remaining(), 0);
        let shown: Vec<_> = restored
            .grid()
            .iter_cells()
            .map(|(_, cell)| cell.display())
            .collect();
        assert_eq!(shown, vec![Some(Kind::Full), None]);
    }

    #[test]
    pub fn test_keys_do_not_collide() {
        let store = scratch_store("keys");
        store.put("level a", "state a", 0).unwrap();
        store.put("level b", "state b", 1).unwrap();
        assert_eq!(store.get("level a").unwrap().expect("stored").0, "state a");
        assert_eq!(store.get("level b").unwrap().expect("stored").0, "state b");
        store.delete("level a").unwrap();
        assert!(store.get("level a").unwrap().is_none());
        assert!(store.get("level b").unwrap().is_some());
    }
}
