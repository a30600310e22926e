/// Common test utilities and helpers for pepper tests
#[allow(dead_code)]
pub mod fixtures {
    use assert_fs::TempDir;
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use std::process::{Command, Output};

    /// Scratch working directory holding an exception file
    pub struct TestEnvironment {
        pub temp_dir: TempDir,
    }

    impl TestEnvironment {
        pub fn new() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            Self { temp_dir }
        }

        pub fn exceptions_path(&self) -> PathBuf {
            self.temp_dir.path().join("exception-repos.json")
        }

        pub fn write_exceptions(&self, content: &str) -> PathBuf {
            let path = self.exceptions_path();
            std::fs::write(&path, content).expect("Failed to write exception file");
            path
        }

        /// Run the pepper binary from inside the scratch directory
        pub fn run(&self, args: &[&str]) -> Output {
            Command::new(env!("CARGO_BIN_EXE_pepper"))
                .args(args)
                .current_dir(self.temp_dir.path())
                .env_remove("RUST_LOG")
                .output()
                .expect("Failed to execute pepper")
        }
    }

    /// Repository entry as returned by the listing endpoints
    #[derive(Debug, Clone)]
    pub struct MockRepository {
        pub owner: String,
        pub name: String,
        pub default_branch: Option<String>,
    }

    impl MockRepository {
        pub fn new(owner: &str, name: &str) -> Self {
            Self {
                owner: owner.to_string(),
                name: name.to_string(),
                default_branch: Some("main".to_string()),
            }
        }

        pub fn with_default_branch(mut self, branch: &str) -> Self {
            self.default_branch = Some(branch.to_string());
            self
        }

        pub fn empty(mut self) -> Self {
            self.default_branch = None;
            self
        }

        pub fn to_json(&self) -> Value {
            json!({
                "id": 1,
                "name": self.name,
                "full_name": format!("{}/{}", self.owner, self.name),
                "owner": author(&self.owner),
                "url": format!("https://api.github.com/repos/{}/{}", self.owner, self.name),
                "private": false,
                "default_branch": self.default_branch
            })
        }
    }

    /// User or organization entry as embedded in repository listings
    pub fn author(login: &str) -> Value {
        let api = format!("https://api.github.com/users/{}", login);
        json!({
            "login": login,
            "id": 1,
            "node_id": "MDQ6VXNlcjE=",
            "avatar_url": "https://avatars.githubusercontent.com/u/1?v=4",
            "gravatar_id": "",
            "url": api,
            "html_url": format!("https://github.com/{}", login),
            "followers_url": format!("{}/followers", api),
            "following_url": format!("{}/following{{/other_user}}", api),
            "gists_url": format!("{}/gists{{/gist_id}}", api),
            "starred_url": format!("{}/starred{{/owner}}{{/repo}}", api),
            "subscriptions_url": format!("{}/subscriptions", api),
            "organizations_url": format!("{}/orgs", api),
            "repos_url": format!("{}/repos", api),
            "events_url": format!("{}/events{{/privacy}}", api),
            "received_events_url": format!("{}/received_events", api),
            "type": "Organization",
            "site_admin": false
        })
    }

    pub fn listing(repositories: &[MockRepository]) -> Value {
        Value::Array(repositories.iter().map(MockRepository::to_json).collect())
    }

    pub fn branch(name: &str, protected: bool) -> Value {
        json!({ "name": name, "protected": protected })
    }

    /// Assertion helper for CLI output
    pub fn assert_contains_all(text: &str, expected: &[&str]) {
        for item in expected {
            assert!(
                text.contains(item),
                "Expected text to contain '{}', but it didn't. Text: {}",
                item,
                text
            );
        }
    }
}
