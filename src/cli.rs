use crate::protection::{Preset, RepositoryType};

/// Inspect and migrate GitHub repository settings through the GitHub graph API.
#[derive(clap::Parser)]
#[command(version, about, long_about = None, propagate_version = true)]
pub struct Arguments
{
	/// Path to the configuration file in YAML format (default: config.yaml, if present)
	#[arg(short, long, global = true, value_name = "PATH", value_hint = clap::ValueHint::FilePath,
		env("REPO_MIGRATOR_CONFIG"))]
	pub config: Option<std::path::PathBuf>,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command
{
	/// Show the branch protection rules of a repository
	ShowProtection
	{
		/// Organization or user owning the repository
		owner: String,
		repository: String,
	},
	/// Add a branch protection rule from a preset
	AddProtection
	{
		owner: String,
		repository: String,
		#[arg(short, long, value_enum)]
		preset: Preset,
		/// Kind of repository, which selects the required status checks
		#[arg(long, value_enum, default_value_t = RepositoryType::Other)]
		repo_type: RepositoryType,
		/// Create the rule instead of only showing it
		#[arg(long)]
		write: bool,
	},
	/// Delete a branch protection rule by its node ID
	DeleteProtection
	{
		rule_id: String,
		/// Delete the rule instead of only reporting it
		#[arg(long)]
		write: bool,
	},
	/// Show repository metadata and deployment environments
	ShowRepository
	{
		owner: String,
		repository: String,
	},
	/// List all repositories of an organization
	ListRepositories
	{
		organization: String,
		/// Also list archived repositories
		#[arg(long)]
		include_archived: bool,
	},
	/// Create a deployment environment in a repository
	CreateEnvironment
	{
		owner: String,
		repository: String,
		name: String,
		/// Create the environment instead of only reporting it
		#[arg(long)]
		write: bool,
	},
	/// Replace all branch protection rules of repositories with presets
	Protect(ProtectArguments),
}

#[derive(clap::Args)]
pub struct ProtectArguments
{
	/// Organization or user owning the repository
	#[arg(required_unless_present = "repository_list")]
	pub owner: Option<String>,
	#[arg(required_unless_present = "repository_list")]
	pub repository: Option<String>,
	/// Kind of repository, which selects the required status checks
	#[arg(long, value_enum, default_value_t = RepositoryType::Other)]
	pub repo_type: RepositoryType,
	/// Apply the `master` preset
	#[arg(long)]
	pub protect_master: bool,
	/// Apply the `gh-pages` preset
	#[arg(long)]
	pub protect_pages: bool,
	/// Apply the `default` preset to all other branches
	#[arg(long)]
	pub protect_default: bool,
	/// YAML or CSV file listing repositories and the presets to apply to each of them
	#[arg(long, value_name = "PATH", value_hint = clap::ValueHint::FilePath,
		conflicts_with_all = ["owner", "repository", "protect_master", "protect_pages",
			"protect_default"])]
	pub repository_list: Option<std::path::PathBuf>,
	/// Apply the changes instead of only reporting them
	#[arg(long)]
	pub write: bool,
}

impl ProtectArguments
{
	/// The repositories to protect, either given directly or read from the repository list.
	pub fn protection_groups(&self)
		-> Result<Vec<crate::protection::ProtectionGroup>, crate::Error>
	{
		if let Some(path) = &self.repository_list
		{
			return crate::protection::read_repository_list(path);
		}

		Ok(self.owner.iter().zip(&self.repository)
			.map(|(owner, repository)| crate::protection::ProtectionGroup
			{
				owner: owner.clone(),
				repo_name: repository.clone(),
				repo_type: self.repo_type,
				master: self.protect_master,
				gh_pages: self.protect_pages,
				default: self.protect_default,
			})
			.collect())
	}
}
