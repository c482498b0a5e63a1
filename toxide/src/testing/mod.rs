//! Shared fixtures for unit and integration tests.

use crate::config::Config;
use crate::model::{Model, Paths, SelfInfo};
use crate::time::FakeTimeProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use toxide_net::{Address, Connection, FriendNumber, PublicKey, UserStatus};

pub struct TestContext {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub time: Arc<FakeTimeProvider>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().to_path_buf();
        Self {
            temp_dir,
            data_dir,
            time: Arc::new(FakeTimeProvider::new()),
        }
    }

    pub fn paths(&self) -> Paths {
        Paths {
            data_file: self.data_dir.join("profile.json"),
            config_file: self.data_dir.join("toxide.toml"),
            blocklist_file: self.data_dir.join("blocklist"),
            download_dir: self.data_dir.join("downloads"),
            chatlogs_dir: self.data_dir.join("chatlogs"),
        }
    }

    pub fn create_model(&self) -> Model {
        self.create_model_with(Config::default())
    }

    pub fn create_model_with(&self, config: Config) -> Model {
        let pk = PublicKey([1u8; 32]);
        let me = SelfInfo {
            address: Address::from_public_key(pk, 7),
            pk,
            name: "tester".to_owned(),
            status: UserStatus::Online,
            note: String::new(),
            connection: Connection::None,
        };
        std::fs::create_dir_all(self.paths().download_dir).unwrap();
        Model::new(me, config, self.paths(), self.time.clone())
    }

    /// Registers a friend with a distinctive key derived from `num`.
    pub fn add_friend(&self, model: &mut Model, num: u32, name: &str) -> FriendNumber {
        let number = FriendNumber(num);
        let mut key = [0u8; 32];
        key[0] = 100 + num as u8;
        key[1] = 0x5A;
        key[2] = num as u8;
        key[3] = 0xC3;
        let config = model.config.clone();
        let friend = model.friends.add(number, PublicKey(key), &config);
        friend.name = name.to_owned();
        model.friends.sort();
        number
    }

    /// Brings a friend online and resorts, like the connection event
    /// handler does.
    pub fn set_online(&self, model: &mut Model, num: FriendNumber) {
        model.friends.set_connection(num, Connection::Udp);
    }

    pub fn advance(&self, by: Duration) {
        self.time.advance(by);
    }
}
