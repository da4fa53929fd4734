use {super::*, options::Options};

#[derive(Debug, Parser)]
#[command(name = "gminer", about = "Scrypt proof-of-work pool mining client")]
pub struct Arguments {
    #[command(flatten)]
    pub options: Options,
}

impl Arguments {
    pub async fn run(self, cancel_token: CancellationToken) -> Result {
        if self.options.version {
            println!("gminer {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        let settings = match Settings::load(self.options) {
            Ok(settings) => settings,
            Err(err) => {
                error!("{err:#}");
                println!();
                let _ = Self::command().print_help();
                process::exit(1);
            }
        };

        settings.print_summary();

        let miner = Miner::new(settings.clone());

        if settings.testnet() && settings.generate() > 0 {
            miner.generate(settings.generate()).await
        } else {
            miner.run(cancel_token).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args() {
        Arguments::try_parse_from(
            "gminer -a scrypt_cpu -p pool.flokicoin.org:15212 -d F8mUqy1cQzv6t1nMvFr5cUyJkF1c"
                .split_whitespace(),
        )
        .unwrap();
    }

    #[test]
    fn parse_args_with_policies() {
        let arguments = Arguments::try_parse_from(
            "gminer -a scrypt_cpu -p pool.flokicoin.org -d F8mUqy1c \
                --mineonce --blockSiesta 1 --slowDownDuration 2 -t 4"
                .split_whitespace(),
        )
        .unwrap();

        assert!(arguments.options.mine_once);
        assert_eq!(arguments.options.threads, Some(4));
    }

    #[test]
    fn missing_value_is_rejected() {
        assert!(Arguments::try_parse_from(["gminer", "-a"]).is_err());
    }
}
