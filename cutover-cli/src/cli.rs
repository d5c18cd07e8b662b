//! Command-line definition.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cutover_provider::{ProviderCredentials, ProviderType};

#[derive(Debug, Parser)]
#[command(name = "dns-cutover")]
#[command(about = "Switch live traffic to a new stack by changing DNS records", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a plan file and print its validation messages
    Validate {
        /// Plan JSON document
        #[arg(long)]
        plan: PathBuf,
    },

    /// Execute a pending plan
    Execute {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        provider: ProviderArgs,

        /// Simulate every provider and health call
        #[arg(long)]
        dry_run: bool,

        /// Print instructions instead of calling the provider
        #[arg(long)]
        manual: bool,

        /// Skip the pre-checks
        #[arg(long)]
        skip_pre_check: bool,

        /// Overall timeout in seconds (overrides the plan)
        #[arg(long)]
        timeout: Option<u64>,

        /// Seconds between re-runs of a failing post-check watched by a trigger
        #[arg(long, default_value_t = 10)]
        post_check_interval: u64,

        /// Nameservers that must agree before a change counts as propagated
        /// (default: all)
        #[arg(long)]
        quorum: Option<usize>,
    },

    /// Revert the applied DNS changes of an executed plan
    Rollback {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        provider: ProviderArgs,

        /// Report what would be reverted without calling the provider
        #[arg(long)]
        dry_run: bool,
    },

    /// List the supported DNS providers
    Providers,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Plan JSON document
    #[arg(long)]
    pub plan: PathBuf,

    /// Write the updated plan here (needed for a later rollback)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Manual,
    Cloudflare,
    Route53,
}

impl ProviderKind {
    pub fn provider_type(self) -> ProviderType {
        match self {
            Self::Manual => ProviderType::Manual,
            Self::Cloudflare => ProviderType::Cloudflare,
            Self::Route53 => ProviderType::Route53,
        }
    }
}

/// Provider selection and credentials, from flags or the environment.
#[derive(Debug, Args)]
pub struct ProviderArgs {
    /// DNS provider that applies the changes
    #[arg(long, value_enum, default_value_t = ProviderKind::Manual)]
    pub provider: ProviderKind,

    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub cloudflare_api_token: Option<String>,

    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    pub cloudflare_zone_id: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub aws_session_token: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    #[arg(long, env = "ROUTE53_HOSTED_ZONE_ID")]
    pub route53_hosted_zone_id: Option<String>,
}

impl ProviderArgs {
    /// Registry name of the selected provider.
    pub fn name(&self) -> &'static str {
        self.provider.provider_type().as_str()
    }

    /// Credentials for the selected provider; missing required values are errors.
    pub fn credentials(&self) -> anyhow::Result<ProviderCredentials> {
        let fields = match self.provider {
            ProviderKind::Manual => vec![],
            ProviderKind::Cloudflare => vec![
                ("apiToken", &self.cloudflare_api_token),
                ("zoneId", &self.cloudflare_zone_id),
            ],
            ProviderKind::Route53 => vec![
                ("accessKeyId", &self.aws_access_key_id),
                ("secretAccessKey", &self.aws_secret_access_key),
                ("sessionToken", &self.aws_session_token),
                ("region", &self.aws_region),
                ("hostedZoneId", &self.route53_hosted_zone_id),
            ],
        };

        let map: HashMap<String, String> = fields
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
            .collect();

        Ok(ProviderCredentials::from_map(
            self.provider.provider_type(),
            &map,
        )?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn provider_args(provider: ProviderKind) -> ProviderArgs {
        ProviderArgs {
            provider,
            cloudflare_api_token: None,
            cloudflare_zone_id: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_session_token: None,
            aws_region: None,
            route53_hosted_zone_id: None,
        }
    }

    #[test]
    fn test_parse_execute() {
        let cli = Cli::try_parse_from([
            "dns-cutover",
            "execute",
            "--plan",
            "plan.json",
            "--dry-run",
            "--timeout",
            "600",
            "--quorum",
            "2",
        ])
        .unwrap();

        match cli.command {
            Command::Execute {
                run,
                provider,
                dry_run,
                timeout,
                quorum,
                post_check_interval,
                ..
            } => {
                assert_eq!(run.plan, PathBuf::from("plan.json"));
                assert!(run.output.is_none());
                assert_eq!(provider.provider, ProviderKind::Manual);
                assert!(dry_run);
                assert_eq!(timeout, Some(600));
                assert_eq!(quorum, Some(2));
                assert_eq!(post_check_interval, 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rollback_provider() {
        let cli = Cli::try_parse_from([
            "dns-cutover",
            "rollback",
            "--plan",
            "plan.json",
            "--provider",
            "cloudflare",
            "--cloudflare-api-token",
            "token",
            "--output",
            "out.json",
        ])
        .unwrap();

        let Command::Rollback { run, provider, .. } = cli.command else {
            panic!("expected rollback");
        };
        assert_eq!(provider.name(), "cloudflare");
        assert_eq!(run.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_manual_needs_no_credentials() {
        let credentials = provider_args(ProviderKind::Manual).credentials().unwrap();
        assert_eq!(credentials.provider_type(), ProviderType::Manual);
    }

    #[test]
    fn test_missing_cloudflare_token_is_error() {
        let err = provider_args(ProviderKind::Cloudflare)
            .credentials()
            .unwrap_err();
        assert!(err.to_string().contains("API Token"));
    }

    #[test]
    fn test_route53_credentials() {
        let mut args = provider_args(ProviderKind::Route53);
        args.aws_access_key_id = Some("AKIAEXAMPLE".to_string());
        args.aws_secret_access_key = Some("secret".to_string());
        args.route53_hosted_zone_id = Some("Z123".to_string());

        match args.credentials().unwrap() {
            ProviderCredentials::Route53 {
                hosted_zone_id,
                region,
                ..
            } => {
                assert_eq!(hosted_zone_id.as_deref(), Some("Z123"));
                assert!(region.is_none());
            }
            other => panic!("unexpected credentials: {other:?}"),
        }
    }
}
