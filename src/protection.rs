//! Branch protection presets and the workflow replacing a repository’s rules with them.

use crate::models::BranchProtectionSettings;

/// Status checks required on the default branch of Python repositories unless configured
/// otherwise.
const DEFAULT_PYTHON_STATUS_CHECKS: &[&str] = &[
	"standard / Conda (3.10) / Python 3.10: conda",
	"standard / Conda (3.9, true) / Python 3.9: conda",
	"standard / Documentation / Python 3.9: documentation building",
	"standard / Pip (3.10) / Python 3.10: pip",
	"standard / Pip (3.9, true) / Python 3.9: pip",
	"standard / pre-commit checks / pre-commit",
];

/// Configuration of the protection presets.
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct Config
{
	/// Status checks the `master` preset requires for Python repositories.
	python_status_checks: Vec<String>,
	/// Status checks the `master` preset requires for TwinCAT and PLC repositories (optional,
	/// default: none).
	twincat_status_checks: Vec<String>,
}

impl Default for Config
{
	fn default() -> Self
	{
		Self
		{
			python_status_checks: DEFAULT_PYTHON_STATUS_CHECKS.iter()
				.map(|&context| context.to_owned())
				.collect(),
			twincat_status_checks: Vec::new(),
		}
	}
}

impl Config
{
	/// Status check contexts required for repositories of the given type.
	pub fn status_checks(&self, repository_type: RepositoryType) -> &[String]
	{
		match repository_type
		{
			RepositoryType::PythonLibrary => &self.python_status_checks,
			RepositoryType::Plc | RepositoryType::TwincatLibrary => &self.twincat_status_checks,
			_ => &[],
		}
	}
}

/// Kind of a repository, which determines the status checks its default branch requires.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum, serde::Deserialize)]
pub enum RepositoryType
{
	#[serde(rename = "Python Library", alias = "python-library")]
	PythonLibrary,
	#[serde(rename = "Python Dev", alias = "python-dev")]
	PythonDev,
	#[serde(rename = "PLC", alias = "plc")]
	Plc,
	#[serde(rename = "TwinCAT Library", alias = "twincat-library")]
	TwincatLibrary,
	#[serde(rename = "Backup", alias = "backup")]
	Backup,
	#[serde(rename = "EPICS IOC", alias = "epics-ioc")]
	EpicsIoc,
	#[serde(rename = "EPICS module", alias = "epics-module")]
	EpicsModule,
	#[serde(rename = "Exempt", alias = "exempt")]
	Exempt,
	#[serde(rename = "External", alias = "external")]
	External,
	#[default]
	#[serde(rename = "Other", alias = "other")]
	Other,
}

/// A named branch protection rule configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Preset
{
	/// Protect `master`: pull requests need one approval and passing status checks, and pushes
	/// are restricted.
	Master,
	/// Protect `gh-pages` while still allowing the documentation deployment to force-push.
	GhPages,
	/// Protect all other branches (`*`) from being created by anyone but administrators, while
	/// allowing deletions.
	Default,
}

impl Preset
{
	/// The rule this preset stands for, given the status checks the repository requires.
	pub fn settings(self, status_checks: &[String]) -> BranchProtectionSettings
	{
		match self
		{
			Self::Master => BranchProtectionSettings
			{
				pattern: "master".to_owned(),
				requires_approving_reviews: true,
				required_approving_review_count: 1,
				requires_status_checks: true,
				required_status_check_contexts: status_checks.to_vec(),
				restricts_pushes: true,
				..Default::default()
			},
			Self::GhPages => BranchProtectionSettings
			{
				pattern: "gh-pages".to_owned(),
				allows_force_pushes: true,
				restricts_pushes: true,
				..Default::default()
			},
			Self::Default => BranchProtectionSettings
			{
				pattern: "*".to_owned(),
				allows_deletions: true,
				blocks_creations: true,
				restricts_pushes: true,
				..Default::default()
			},
		}
	}
}

/// Whether to apply changes or only report what would change.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode
{
	DryRun,
	Write,
}

impl Mode
{
	pub fn from_write_flag(write: bool) -> Self
	{
		match write
		{
			true => Self::Write,
			false => Self::DryRun,
		}
	}
}

/// The presets to apply to one repository, as listed in a repository list file.
///
/// The flags selecting presets accept booleans as well as `y`, `yes`, and `true` in any case.
/// Anything else, including an empty cell, leaves the preset out.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
pub struct ProtectionGroup
{
	pub owner: String,
	pub repo_name: String,
	#[serde(default)]
	pub repo_type: RepositoryType,
	/// Apply the [Preset::Master] preset.
	#[serde(default, deserialize_with = "deserialize_flag")]
	pub master: bool,
	/// Apply the [Preset::GhPages] preset.
	#[serde(default, deserialize_with = "deserialize_flag")]
	pub gh_pages: bool,
	/// Apply the [Preset::Default] preset.
	#[serde(default, deserialize_with = "deserialize_flag")]
	pub default: bool,
}

/// Number of rules deleted and created (or that would have been, in a dry run).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Summary
{
	pub deleted: usize,
	pub created: usize,
}

impl ProtectionGroup
{
	/// The selected presets, in the order they are applied.
	pub fn presets(&self) -> Vec<Preset>
	{
		[(self.master, Preset::Master), (self.gh_pages, Preset::GhPages),
			(self.default, Preset::Default)]
			.into_iter()
			.filter_map(|(selected, preset)| selected.then_some(preset))
			.collect()
	}

	/// Replace all branch protection rules of the repository with the selected presets.
	///
	/// Existing rules are deleted first, since the graph API rejects a second rule for a pattern
	/// that already has one. In [Mode::DryRun], the repository is only read.
	pub async fn apply(&self, client: &crate::github_api::Client, config: &Config, mode: Mode)
		-> Result<Summary, crate::Error>
	{
		let rules: Vec<_> = self.presets().into_iter()
			.map(|preset| preset.settings(config.status_checks(self.repo_type)))
			.collect();

		// Reject bad settings before changing anything
		for settings in &rules
		{
			settings.validate()?;
		}

		let repository = client.show_branch_protection(&self.owner, &self.repo_name).await?;
		let existing_rules = &repository.branch_protection_rules;
		let mut summary = Summary::default();

		if existing_rules.total_count.map_or(false, |total_count|
			total_count > existing_rules.nodes.len() as u64)
		{
			log::warn!("repository “{}/{}” has more branch protection rules than were fetched, \
				run again to delete the remaining ones", self.owner, self.repo_name);
		}

		for rule in &existing_rules.nodes
		{
			match mode
			{
				Mode::Write =>
				{
					log::info!("deleting branch protection rule for “{}” in repository “{}/{}”",
						rule.pattern, self.owner, self.repo_name);
					client.delete_branch_protection(&rule.id).await?;
				},
				Mode::DryRun => log::info!("(dry run) would delete branch protection rule for “{}” \
					in repository “{}/{}”", rule.pattern, self.owner, self.repo_name),
			}

			summary.deleted += 1;
		}

		for settings in &rules
		{
			match mode
			{
				Mode::Write =>
				{
					let rule = client.add_branch_protection(&repository.id, settings).await?;
					log::info!("created branch protection rule {} for “{}” in repository “{}/{}”",
						rule.id, rule.pattern, self.owner, self.repo_name);
				},
				Mode::DryRun => log::info!("(dry run) would create branch protection rule for “{}” \
					in repository “{}/{}”", settings.pattern, self.owner, self.repo_name),
			}

			summary.created += 1;
		}

		Ok(summary)
	}
}

/// Read a list of repositories and the presets to apply to them.
///
/// Files ending in `.csv` hold comma-separated values with a header row naming the columns
/// `owner`, `repo_name`, `repo_type`, `master`, `gh_pages`, and `default`, while other columns are
/// ignored. Any other file is read as a YAML sequence with the same keys.
pub fn read_repository_list<P>(path: P) -> Result<Vec<ProtectionGroup>, crate::Error>
where
	P: AsRef<std::path::Path>
{
	let file = std::fs::File::open(&path).map_err(crate::Error::ReadRepositoryList)?;

	let is_csv = path.as_ref().extension()
		.map_or(false, |extension| extension.eq_ignore_ascii_case("csv"));

	match is_csv
	{
		true => parse_csv_repository_list(file),
		false => serde_yaml::from_reader(&file).map_err(crate::Error::ParseRepositoryList),
	}
}

#[doc(hidden)]
fn parse_csv_repository_list<R>(reader: R) -> Result<Vec<ProtectionGroup>, crate::Error>
where
	R: std::io::Read
{
	let mut reader = csv::ReaderBuilder::new()
		.trim(csv::Trim::All)
		.from_reader(reader);

	reader.deserialize::<ProtectionGroup>()
		.collect::<Result<_, _>>()
		.map_err(crate::Error::ParseRepositoryListCsv)
}

#[doc(hidden)]
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
	D: serde::Deserializer<'de>,
{
	struct FlagVisitor;

	impl<'de> serde::de::Visitor<'de> for FlagVisitor
	{
		type Value = bool;

		fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result
		{
			formatter.write_str("a boolean or one of “y”, “yes”, and “true”")
		}

		fn visit_bool<E>(self, value: bool) -> Result<bool, E>
		where
			E: serde::de::Error,
		{
			Ok(value)
		}

		fn visit_str<E>(self, value: &str) -> Result<bool, E>
		where
			E: serde::de::Error,
		{
			Ok(["y", "yes", "true"].iter().any(|truthy| value.eq_ignore_ascii_case(truthy)))
		}

		fn visit_unit<E>(self) -> Result<bool, E>
		where
			E: serde::de::Error,
		{
			Ok(false)
		}

		fn visit_none<E>(self) -> Result<bool, E>
		where
			E: serde::de::Error,
		{
			Ok(false)
		}
	}

	deserializer.deserialize_any(FlagVisitor)
}

#[cfg(test)]
mod tests
{
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn group() -> ProtectionGroup
	{
		ProtectionGroup
		{
			owner: "pcdshub".to_owned(),
			repo_name: "typhos".to_owned(),
			repo_type: RepositoryType::PythonLibrary,
			master: true,
			gh_pages: false,
			default: true,
		}
	}

	async fn mount_existing_rules(mock_server: &MockServer)
	{
		let rule = |id: &str, pattern: &str| json!({
			"id": id,
			"pattern": pattern,
			"allowsDeletions": false,
			"allowsForcePushes": false,
			"blocksCreations": false,
			"dismissesStaleReviews": false,
			"isAdminEnforced": true,
			"requiredApprovingReviewCount": 1,
			"requiredStatusCheckContexts": [],
			"requiresApprovingReviews": true,
			"requiresCodeOwnerReviews": false,
			"requiresStatusChecks": false,
			"restrictsPushes": false,
			"restrictsReviewDismissals": false,
			"creator": null,
		});

		Mock::given(method("POST"))
			.and(body_partial_json(json!({"operationName": "showBranchProtection"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": {"repository": {
					"id": "R_1",
					"name": "typhos",
					"branchProtectionRules": {
						"totalCount": 2,
						"nodes": [rule("BPR_1", "master"), rule("BPR_2", "main")],
					},
				}},
			})))
			.expect(1)
			.mount(mock_server)
			.await;
	}

	#[test]
	fn presets_follow_selection_order()
	{
		assert_eq!(group().presets(), [Preset::Master, Preset::Default]);
	}

	#[test]
	fn status_checks_depend_on_repository_type()
	{
		let config = Config::default();

		assert_eq!(config.status_checks(RepositoryType::PythonLibrary).len(), 6);
		assert!(config.status_checks(RepositoryType::Plc).is_empty());
		assert!(config.status_checks(RepositoryType::EpicsIoc).is_empty());

		let master = Preset::Master.settings(config.status_checks(RepositoryType::PythonLibrary));
		assert!(master.requires_status_checks);
		assert_eq!(master.required_status_check_contexts[5],
			"standard / pre-commit checks / pre-commit");
	}

	#[test]
	fn presets_are_consistent()
	{
		for preset in [Preset::Master, Preset::GhPages, Preset::Default]
		{
			assert!(preset.settings(&[]).validate().is_ok(), "{preset:?}");
		}
	}

	#[test]
	fn parse_repository_list()
	{
		let groups: Vec<ProtectionGroup> = serde_yaml::from_str(
			"- owner: pcdshub
			  repo_name: lcls-twincat-motion
			  repo_type: TwinCAT Library
			  master: true
			- owner: pcdshub
			  repo_name: pcdsdevices
			  repo_type: python-library
			  gh_pages: true
			".replace("\t", "").as_str()).unwrap();

		assert_eq!(groups.len(), 2);
		assert_eq!(groups[0].repo_type, RepositoryType::TwincatLibrary);
		assert_eq!(groups[0].presets(), [Preset::Master]);
		assert_eq!(groups[1].repo_type, RepositoryType::PythonLibrary);
		assert_eq!(groups[1].presets(), [Preset::GhPages]);
	}

	#[test]
	fn parse_csv_repository_list_with_yes_no_flags()
	{
		let groups = parse_csv_repository_list(
			"owner,repo_name,repo_type,master,gh_pages,default,notes\n\
			pcdshub,lcls-twincat-motion,TwinCAT Library,Yes,,n,core library\n\
			pcdshub, typhos ,Python Library,y,TRUE,true,\n".as_bytes()).unwrap();

		assert_eq!(groups.len(), 2);
		assert_eq!(groups[0].repo_name, "lcls-twincat-motion");
		assert_eq!(groups[0].repo_type, RepositoryType::TwincatLibrary);
		assert_eq!(groups[0].presets(), [Preset::Master]);
		assert_eq!(groups[1].repo_name, "typhos");
		assert_eq!(groups[1].presets(), [Preset::Master, Preset::GhPages, Preset::Default]);
	}

	#[test]
	fn read_repository_list_by_extension()
	{
		let path = std::env::temp_dir()
			.join(format!("repo-migrator-{}-repositories.CSV", std::process::id()));
		std::fs::write(&path, "owner,repo_name,repo_type,master,gh_pages,default\n\
			pcdshub,pcdsdevices,Python Library,no,yes,no\n").unwrap();

		let groups = read_repository_list(&path);
		std::fs::remove_file(&path).unwrap();

		let groups = groups.unwrap();
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].presets(), [Preset::GhPages]);

		assert!(matches!(read_repository_list("/nonexistent/repositories.csv"),
			Err(crate::Error::ReadRepositoryList(_))));
	}

	#[test]
	fn csv_repository_list_rejects_unknown_repository_types()
	{
		let result = parse_csv_repository_list(
			"owner,repo_name,repo_type\npcdshub,typhos,Spreadsheet\n".as_bytes());

		assert!(matches!(result, Err(crate::Error::ParseRepositoryListCsv(_))));
	}

	#[tokio::test]
	async fn dry_run_only_reads()
	{
		let mock_server = MockServer::start().await;
		mount_existing_rules(&mock_server).await;

		let client = crate::github_api::test_client(&mock_server);
		let summary = group().apply(&client, &Config::default(), Mode::DryRun).await.unwrap();

		assert_eq!(summary, Summary{deleted: 2, created: 2});
		assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn write_replaces_existing_rules()
	{
		let mock_server = MockServer::start().await;
		mount_existing_rules(&mock_server).await;

		Mock::given(method("POST"))
			.and(body_partial_json(json!({"operationName": "deleteBranchProtection"})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": {"deleteBranchProtectionRule": {"clientMutationId": null}},
			})))
			.expect(2)
			.mount(&mock_server)
			.await;

		for pattern in ["master", "*"]
		{
			Mock::given(method("POST"))
				.and(body_partial_json(json!({
					"operationName": "addBranchProtection",
					"variables": {"repositoryId": "R_1", "branchPattern": pattern},
				})))
				.respond_with(ResponseTemplate::new(200).set_body_json(json!({
					"data": {"createBranchProtectionRule": {"branchProtectionRule": {
						"id": format!("BPR_{pattern}"),
						"pattern": pattern,
						"allowsDeletions": pattern == "*",
						"allowsForcePushes": false,
						"blocksCreations": pattern == "*",
						"dismissesStaleReviews": false,
						"isAdminEnforced": false,
						"requiredApprovingReviewCount": null,
						"requiredStatusCheckContexts": null,
						"requiresApprovingReviews": pattern == "master",
						"requiresCodeOwnerReviews": false,
						"requiresStatusChecks": pattern == "master",
						"restrictsPushes": true,
						"restrictsReviewDismissals": false,
						"creator": {"login": "ecs-bot"},
					}}},
				})))
				.expect(1)
				.mount(&mock_server)
				.await;
		}

		let client = crate::github_api::test_client(&mock_server);
		let summary = group().apply(&client, &Config::default(), Mode::Write).await.unwrap();

		assert_eq!(summary, Summary{deleted: 2, created: 2});

		let requests = mock_server.received_requests().await.unwrap();
		let operations: Vec<_> = requests.iter()
			.map(|request| serde_json::from_slice::<serde_json::Value>(&request.body).unwrap()
				["operationName"].as_str().unwrap().to_owned())
			.collect();

		// Rules are deleted before any new one is created
		assert_eq!(operations, ["showBranchProtection", "deleteBranchProtection",
			"deleteBranchProtection", "addBranchProtection", "addBranchProtection"]);
	}
}
