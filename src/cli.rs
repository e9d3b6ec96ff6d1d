use clap::{ArgGroup, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "macshift",
    author,
    version,
    about = "Inspect and change network interface MAC addresses with safe backup/restore",
    group(ArgGroup::new("action").args(["set", "random", "restore"]))
)]
pub struct Cli {
    /// List non-loopback interfaces and their current MACs
    #[arg(long, short = 'l')]
    pub list: bool,

    /// Network interface to operate on (e.g. wlan0); prompts if omitted
    #[arg(long, short = 'i', value_name = "IFACE")]
    pub interface: Option<String>,

    /// Print the current MAC for the selected interface
    #[arg(long)]
    pub show: bool,

    /// Set an explicit MAC address (format aa:bb:cc:dd:ee:ff)
    #[arg(long, short = 's', value_name = "MAC")]
    pub set: Option<String>,

    /// Apply a locally-administered random MAC
    #[arg(long, short = 'r')]
    pub random: bool,

    /// Restore the backed-up original MAC
    #[arg(long, short = 'R')]
    pub restore: bool,

    /// Answer yes to confirmation prompts
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_random_are_exclusive() {
        let result = Cli::try_parse_from([
            "macshift",
            "-i",
            "eth0",
            "--set",
            "aa:bb:cc:dd:ee:ff",
            "--random",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn typical_set_invocation_parses() {
        let cli =
            Cli::try_parse_from(["macshift", "-i", "wlan0", "-s", "aa:bb:cc:dd:ee:ff", "-y"])
                .unwrap();
        assert_eq!(cli.interface.as_deref(), Some("wlan0"));
        assert_eq!(cli.set.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert!(cli.yes);
        assert!(!cli.random);
    }

    #[test]
    fn bare_interface_means_interactive() {
        let cli = Cli::try_parse_from(["macshift", "--interface", "eth0"]).unwrap();
        assert!(!cli.list && !cli.show && !cli.random && !cli.restore);
        assert!(cli.set.is_none());
    }
}
