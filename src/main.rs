#[doc(hidden)]
mod cli;
#[doc(hidden)]
mod config;
#[doc(hidden)]
mod error;
pub mod github_api;
pub mod graphql;
#[doc(hidden)]
mod models;
pub mod protection;

pub use config::Config;
pub use error::{Error, GraphQlError, RemoteError, TransportError, ValidationError};
pub use models::*;

use protection::Mode;

#[tokio::main]
async fn main() -> anyhow::Result<()>
{
	pretty_env_logger::init();

	let arguments = <cli::Arguments as clap::Parser>::parse();

	// Read the config file
	let config = Config::load(arguments.config.as_deref())?;

	// Initialize a new GitHub graph API client with the configured access token
	let github_api_client = github_api::Client::from_config(config.github_api)?;

	match arguments.command
	{
		cli::Command::ShowProtection{owner, repository} =>
		{
			let repository = github_api_client.show_branch_protection(&owner, &repository).await?;

			println!("{} ({})", repository.name, repository.id);

			for rule in &repository.branch_protection_rules.nodes
			{
				print_branch_protection_rule(rule);
			}
		},
		cli::Command::AddProtection{owner, repository, preset, repo_type, write} =>
		{
			let settings = preset.settings(config.protection.status_checks(repo_type));
			settings.validate()?;

			let repository = github_api_client.show_branch_protection(&owner, &repository).await?;

			match Mode::from_write_flag(write)
			{
				Mode::Write =>
				{
					let rule = github_api_client.add_branch_protection(&repository.id, &settings)
						.await?;
					print_branch_protection_rule(&rule);
				},
				Mode::DryRun => log::info!("(dry run) would create branch protection rule {:?} in \
					repository “{owner}/{}”", settings, repository.name),
			}
		},
		cli::Command::DeleteProtection{rule_id, write} => match Mode::from_write_flag(write)
		{
			Mode::Write =>
			{
				github_api_client.delete_branch_protection(&rule_id).await?;
				log::info!("deleted branch protection rule {rule_id}");
			},
			Mode::DryRun => log::info!("(dry run) would delete branch protection rule {rule_id}"),
		},
		cli::Command::ShowRepository{owner, repository} =>
		{
			let info = github_api_client.show_repository_info(&owner, &repository).await?;

			print_repository(&info.repository);

			for environment in &info.environments.nodes
			{
				println!("  environment “{}” ({})", environment.name, environment.id);

				for rule in &environment.protection_rules.nodes
				{
					println!("    wait timer: {} minute(s)", rule.timeout);

					for reviewer in &rule.reviewers.nodes
					{
						println!("    required reviewer: {reviewer}");
					}
				}
			}
		},
		cli::Command::ListRepositories{organization, include_archived} =>
		{
			use futures::TryStreamExt as _;

			let repositories = github_api_client.list_all_repos_in_org(&organization);
			futures::pin_mut!(repositories);

			while let Some(repository) = repositories.try_next().await?
			{
				if include_archived || !repository.is_archived
				{
					print_repository(&repository);
				}
			}
		},
		cli::Command::CreateEnvironment{owner, repository, name, write} =>
		{
			let info = github_api_client.show_repository_info(&owner, &repository).await?;

			match Mode::from_write_flag(write)
			{
				Mode::Write =>
				{
					let environment = github_api_client
						.create_environment(&info.repository.id, &name).await?;
					log::info!("created environment “{}” ({}) in repository “{}”", environment.name,
						environment.id, info.repository.name_with_owner);
				},
				Mode::DryRun => log::info!("(dry run) would create environment “{name}” in \
					repository “{}”", info.repository.name_with_owner),
			}
		},
		cli::Command::Protect(protect_arguments) =>
		{
			let mode = Mode::from_write_flag(protect_arguments.write);

			for group in protect_arguments.protection_groups()?
			{
				let summary = group.apply(&github_api_client, &config.protection, mode).await?;

				log::info!("repository “{}/{}”: {} rule(s) deleted, {} rule(s) created{}",
					group.owner, group.repo_name, summary.deleted, summary.created,
					if mode == Mode::DryRun {" (dry run)"} else {""});
			}
		},
	}

	Ok(())
}

#[doc(hidden)]
fn print_repository(repository: &Repository)
{
	let archived = if repository.is_archived {" [archived]"} else {""};

	println!("{}{archived}: {}", repository.name_with_owner,
		repository.description.as_deref().unwrap_or(""));
}

#[doc(hidden)]
fn print_branch_protection_rule(rule: &BranchProtectionRule)
{
	println!("  “{}” ({})", rule.pattern, rule.id);
	println!("    approving reviews required: {}", match rule.requires_approving_reviews
	{
		true => rule.required_approving_review_count.unwrap_or(0).to_string(),
		false => "no".to_owned(),
	});
	println!("    status checks required: {}", match rule.requires_status_checks
	{
		true => rule.required_status_check_contexts.join(", "),
		false => "no".to_owned(),
	});
	println!("    pushes restricted: {}, creations blocked: {}, deletions allowed: {}, \
		force pushes allowed: {}", rule.restricts_pushes, rule.blocks_creations,
		rule.allows_deletions, rule.allows_force_pushes);

	if let Some(creator) = &rule.creator
	{
		println!("    created by: {}", creator.login);
	}
}
