// Sled-backed cache of the player's state, one tree per profile directory.
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use game_core::{
    CollectionEntry,
    PlayerState,
    STARTING_BUBIX,
};
use rand::{
    Rng,
    distr::Alphanumeric,
};
use sled::{
    Config,
    Db,
    Tree,
};
use std::{
    collections::HashMap,
    path::Path,
};

const PLAYER_ID_KEY: &[u8] = b"booba-player-id";
const COLLECTION_KEY: &[u8] = b"booba-collection";
const BUBIX_KEY: &[u8] = b"booba-bubix";
const TOTAL_OPENED_KEY: &[u8] = b"booba-total-opened";

pub struct LocalStore {
    tree: Tree,
}

impl LocalStore {
    pub fn new(db: &Db) -> Result<Self> {
        let tree = db
            .open_tree("player_cache")
            .wrap_err("open player_cache tree")?;
        Ok(Self { tree })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::default().path(path);
        let db = config.open().wrap_err("open local player cache")?;
        Self::new(&db)
    }

    /// Stable identity for this cache. Generated on first use, reused forever.
    pub fn player_id<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
        if let Some(bytes) = self.tree.get(PLAYER_ID_KEY)? {
            let id = String::from_utf8(bytes.to_vec())
                .wrap_err("cached player id is not valid UTF-8")?;
            return Ok(id);
        }

        let suffix: String = (0..9)
            .map(|_| rng.sample(Alphanumeric) as char)
            .collect::<String>()
            .to_lowercase();
        let id = format!("player_{suffix}");
        self.tree
            .insert(PLAYER_ID_KEY, id.as_bytes())
            .wrap_err("write player id")?;
        self.tree.flush().wrap_err("flush player cache")?;
        Ok(id)
    }

    /// Cached state, or a fresh profile when nothing was saved yet.
    pub fn load(&self) -> Result<PlayerState> {
        let bubix = match self.tree.get(BUBIX_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_ref()
                    .try_into()
                    .wrap_err("cached balance should be 8 bytes")?;
                i64::from_be_bytes(arr)
            }
            None => STARTING_BUBIX,
        };

        let total_opened = match self.tree.get(TOTAL_OPENED_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes
                    .as_ref()
                    .try_into()
                    .wrap_err("cached open counter should be 4 bytes")?;
                u32::from_be_bytes(arr)
            }
            None => 0,
        };

        let collection: HashMap<String, CollectionEntry> =
            match self.tree.get(COLLECTION_KEY)? {
                Some(bytes) => serde_json::from_slice(bytes.as_ref())
                    .wrap_err("decode cached collection")?,
                None => HashMap::new(),
            };

        Ok(PlayerState {
            bubix,
            total_opened,
            collection,
        })
    }

    pub fn persist(&self, state: &PlayerState) -> Result<()> {
        self.tree
            .insert(BUBIX_KEY, state.bubix.to_be_bytes().as_slice())
            .wrap_err("write cached balance")?;
        self.tree
            .insert(
                TOTAL_OPENED_KEY,
                state.total_opened.to_be_bytes().as_slice(),
            )
            .wrap_err("write cached open counter")?;
        let collection =
            serde_json::to_vec(&state.collection).wrap_err("encode cached collection")?;
        self.tree
            .insert(COLLECTION_KEY, collection)
            .wrap_err("write cached collection")?;
        self.tree.flush().wrap_err("flush player cache")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::LocalStore;
    use game_core::{
        PlayerState,
        STARTING_BUBIX,
        default_catalog,
    };
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };
    use tempdir::TempDir;

    fn sled_db(temp_dir: &TempDir) -> sled::Db {
        sled::Config::default()
            .path(temp_dir.path())
            .open()
            .expect("open sled db")
    }

    #[test]
    fn load__fresh_cache_returns_a_new_profile() {
        // given
        let temp_dir = TempDir::new("local_store_fresh").unwrap();
        let db = sled_db(&temp_dir);
        let store = LocalStore::new(&db).unwrap();

        // when
        let state = store.load().unwrap();

        // then
        assert_eq!(state.bubix, STARTING_BUBIX);
        assert_eq!(state.total_opened, 0);
        assert!(state.collection.is_empty());
    }

    #[test]
    fn sut__when_persisted_then_reload_returns_the_same_state() {
        // given
        let temp_dir = TempDir::new("local_store_roundtrip").unwrap();
        let db = sled_db(&temp_dir);
        let store = LocalStore::new(&db).unwrap();

        let mut state = PlayerState::new();
        let item = &default_catalog()[0];
        state.record_opening(item, chrono::Utc::now());

        // when
        store.persist(&state).unwrap();
        let reloaded = store.load().unwrap();

        // then
        assert_eq!(reloaded, state);
    }

    #[test]
    fn player_id__is_generated_once_and_stays_stable() {
        // given
        let temp_dir = TempDir::new("local_store_player_id").unwrap();
        let db = sled_db(&temp_dir);
        let store = LocalStore::new(&db).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // when
        let first = store.player_id(&mut rng).unwrap();
        let second = store.player_id(&mut rng).unwrap();

        // then
        assert_eq!(first, second);
        assert!(first.starts_with("player_"));
        let suffix = first.strip_prefix("player_").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn player_id__survives_reopening_the_cache() {
        // given
        let temp_dir = TempDir::new("local_store_reopen").unwrap();
        let first = {
            let store = LocalStore::open(temp_dir.path()).unwrap();
            let mut rng = StdRng::seed_from_u64(7);
            store.player_id(&mut rng).unwrap()
        };

        // when
        let store = LocalStore::open(temp_dir.path()).unwrap();
        let mut rng = StdRng::seed_from_u64(1234);
        let second = store.player_id(&mut rng).unwrap();

        // then
        assert_eq!(first, second);
    }
}
