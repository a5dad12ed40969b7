/// Path of the configuration file read when none is given explicitly.
pub const DEFAULT_PATH: &str = "config.yaml";

#[derive(Default, serde::Deserialize)]
/// Top-level configuration of this application.
///
/// All sections are optional. Without a configuration file, the GitHub.com graph API is used with
/// the access token from the `GITHUB_TOKEN` environment variable.
pub struct Config
{
	/// Configuration options specific to the GitHub API and authentication.
	#[serde(default)]
	pub github_api: crate::github_api::Config,
	/// Status checks required by the branch protection presets.
	#[serde(default)]
	pub protection: crate::protection::Config,
}

impl Config
{
	/// Attempt to read and parse the configuration from a YAML file.
	///
	/// # Arguments
	/// `path`: Path to the configuration file in YAML format.
	pub fn from_file<P>(path: P) -> Result<Self, crate::Error>
	where
		P: AsRef<std::path::Path>
	{
		let file = std::fs::File::open(&path).map_err(crate::Error::ReadConfigFile)?;
		serde_yaml::from_reader(&file).map_err(crate::Error::ParseConfigFile)
	}

	/// Read the configuration from the given file, or from [DEFAULT_PATH] if it exists.
	///
	/// An explicitly given file must exist, while a missing default file means default settings.
	pub fn load(path: Option<&std::path::Path>) -> Result<Self, crate::Error>
	{
		match path
		{
			Some(path) => Self::from_file(path),
			None if std::path::Path::new(DEFAULT_PATH).exists() => Self::from_file(DEFAULT_PATH),
			None =>
			{
				log::debug!("no configuration file “{DEFAULT_PATH}” found, using defaults");
				Ok(Self::default())
			},
		}
	}
}
