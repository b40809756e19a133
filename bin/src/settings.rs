//! command line & tracing configs

pub mod cli {
    //! Parse from either cli or env var

    /// tokio worker thread name
    pub static DEFAULT_THREAD_NAME: &str = "beacon-worker";
    /// the default path to config
    pub static DEFAULT_CONFIG_PATH: &str = "/etc/beacon/config.yaml";
    /// default log level. Can use this argument or BEACON_LOG env var
    pub const DEFAULT_BEACON_LOG: &str = "info";
    /// log as "json", "pretty" or "standard" (unstructured)
    pub const DEFAULT_LOG_FORMAT: &str = "standard";

    use std::{collections::HashMap, path::PathBuf};

    use beacon_client::Method;
    pub use clap::Parser;
    use clap::{Args, Subcommand};

    #[derive(Parser, Debug, Clone, PartialEq, Eq)]
    #[clap(author, name = "beacon", bin_name = "beacon", about, long_about = None)]
    /// parses from cli & environment var. beacon will load `.env` in the working dir as well
    pub struct Config {
        /// path to the client config (yaml or json)
        #[clap(
            short,
            long,
            value_parser,
            env,
            default_value = DEFAULT_CONFIG_PATH
        )]
        pub config_path: PathBuf,
        /// json file answering orchestration requests. Without it every
        /// orchestration comes back empty
        #[clap(long, env, value_parser)]
        pub orchestration_response: Option<PathBuf>,
        /// Worker thread name
        #[clap(long, env, value_parser, default_value = DEFAULT_THREAD_NAME)]
        pub thread_name: String,
        /// number of worker threads, defaults to the number of logical CPUs
        #[clap(long, env, value_parser)]
        pub threads: Option<usize>,
        /// set the log level. All valid RUST_LOG arguments are accepted
        #[clap(long, env, value_parser, default_value = DEFAULT_BEACON_LOG)]
        pub beacon_log: String,
        /// log format: standard, json or pretty
        #[clap(long, env, value_parser, default_value = DEFAULT_LOG_FORMAT)]
        pub log_format: String,
        #[clap(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
    pub enum Command {
        /// advertise a service of this client
        Register(ServiceArgs),
        /// advertise a service on behalf of another system
        RegisterExternal(ExternalArgs),
        /// withdraw a service of this client
        Unregister {
            #[clap(long)]
            service_definition: String,
        },
        /// look up providers of a service
        Orchestrate {
            #[clap(long)]
            service_definition: String,
            /// required interface, e.g. HTTP-INSECURE-JSON
            #[clap(long)]
            interface: String,
            #[clap(long, value_parser = parse_method, default_value = "GET")]
            http_method: Method,
            #[clap(long = "metadata", value_parser = parse_key_val)]
            metadata: Vec<(String, String)>,
            /// check every result against the requested service & current interface
            #[clap(long)]
            validate: bool,
        },
        /// subscribe to one event, or to every configured event when none is given
        Subscribe {
            #[clap(long, requires = "path")]
            event: Option<String>,
            /// notification path relative to the base notification uri
            #[clap(long)]
            path: Option<String>,
        },
        /// drop the subscription to an event
        Unsubscribe {
            #[clap(long)]
            event: String,
        },
        /// publish one event
        Publish {
            #[clap(long)]
            event: String,
            #[clap(long, default_value = "")]
            payload: String,
            #[clap(long = "metadata", value_parser = parse_key_val)]
            metadata: Vec<(String, String)>,
        },
        /// print the configured publisher or subscriber events
        Events {
            #[clap(long)]
            publisher: bool,
        },
    }

    #[derive(Args, Debug, Clone, PartialEq, Eq)]
    pub struct ServiceArgs {
        #[clap(long)]
        pub service_definition: String,
        #[clap(long)]
        pub service_uri: String,
        #[clap(long, value_parser = parse_method)]
        pub http_method: Option<Method>,
        /// extra metadata as key=value, may be repeated
        #[clap(long = "metadata", value_parser = parse_key_val)]
        pub metadata: Vec<(String, String)>,
    }

    impl ServiceArgs {
        pub fn metadata(&self) -> Option<HashMap<String, String>> {
            to_map(&self.metadata)
        }
    }

    #[derive(Args, Debug, Clone, PartialEq, Eq)]
    pub struct ExternalArgs {
        #[clap(long)]
        pub system_name: String,
        #[clap(long)]
        pub address: String,
        #[clap(long)]
        pub port: u16,
        #[clap(long)]
        pub ssl: bool,
        #[clap(long)]
        pub token: bool,
        #[clap(flatten)]
        pub service: ServiceArgs,
    }

    pub fn to_map(pairs: &[(String, String)]) -> Option<HashMap<String, String>> {
        (!pairs.is_empty()).then(|| pairs.iter().cloned().collect())
    }

    fn parse_key_val(s: &str) -> Result<(String, String), String> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
        if key.is_empty() {
            return Err(format!("empty key in `{s}`"));
        }
        Ok((key.to_owned(), value.to_owned()))
    }

    fn parse_method(s: &str) -> Result<Method, String> {
        Method::from_bytes(s.to_ascii_uppercase().as_bytes()).map_err(|err| err.to_string())
    }

}

pub mod trace {
    //! Log output for the `beacon` CLI. Requests printed by the dry-run
    //! transport go to stdout; these logs share it, so `json` keeps them
    //! machine separable.
    use anyhow::Result;
    use tracing_subscriber::{
        filter::EnvFilter,
        fmt::{
            self,
            format::{Format, PrettyFields},
        },
        prelude::__tracing_subscriber_SubscriberExt,
        util::SubscriberInitExt,
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum LogFormat {
        #[default]
        Standard,
        Json,
        Pretty,
    }

    impl LogFormat {
        /// Unknown names fall back to `Standard`.
        pub fn from_name(name: &str) -> Self {
            match name.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => LogFormat::Standard,
            }
        }
    }

    /// Installed logging setup for one run of `beacon`.
    #[derive(Debug)]
    pub struct Config {
        pub format: LogFormat,
    }

    impl Config {
        /// Install the global subscriber. `beacon_log` is an `EnvFilter`
        /// directive; an unparsable one falls back to `info`.
        pub fn parse(beacon_log: &str, log_format: &str) -> Result<Self> {
            let filter = EnvFilter::try_new(beacon_log).or_else(|_| EnvFilter::try_new("info"))?;
            let format = LogFormat::from_name(log_format);
            let registry = tracing_subscriber::registry().with(filter);

            match format {
                LogFormat::Json => registry.with(fmt::layer().json()).init(),
                LogFormat::Pretty => registry
                    .with(
                        fmt::layer()
                            .event_format(Format::default().pretty().with_source_location(false))
                            .fmt_fields(PrettyFields::new()),
                    )
                    .init(),
                LogFormat::Standard => registry.with(fmt::layer()).init(),
            }

            Ok(Self { format })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_log_format_names() {
            assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
            assert_eq!(LogFormat::from_name(" Pretty "), LogFormat::Pretty);
            assert_eq!(LogFormat::from_name("standard"), LogFormat::Standard);
            assert_eq!(LogFormat::from_name("xml"), LogFormat::Standard);
        }
    }
}
