//! Thin command dispatcher over the engine, driving the RNS chain ring.

use clap::{Parser, Subcommand};
use log::info;
use ripfe::error::Result;
use ripfe::io::{load, read_matrix, read_vector, save};
use ripfe::{Ciphertext, FunctionKey, GaussianSampler, Ipfe, PrimeChainRing, PublicKey, SecretKey};
use std::path::PathBuf;
use std::time::Instant;

type ChainIpfe = Ipfe<PrimeChainRing>;

#[derive(Parser)]
#[command(name = "ripfe", about = "Inner-product functional encryption over RLWE")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Search parameters and write them to a file.
    Params {
        #[arg(long, default_value_t = 128)]
        sec: u32,
        /// Vector length.
        #[arg(short, long)]
        l: usize,
        /// Maximum number of simultaneously encrypted rows.
        #[arg(long, default_value_t = 1)]
        rows: usize,
        /// Plaintext coefficient bound.
        #[arg(long)]
        bx: i64,
        /// Function-vector coefficient bound.
        #[arg(long)]
        by: i64,
        /// Use the rounded-Gaussian sampler instead of FACCT.
        #[arg(long)]
        rounded: bool,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Generate a master secret key.
    Keygen {
        #[arg(short, long)]
        params: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Derive the master public key.
    Pubkey {
        #[arg(short, long)]
        params: PathBuf,
        #[arg(long)]
        msk: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Derive a function key for a vector read from a text file.
    Keyder {
        #[arg(short, long)]
        params: PathBuf,
        #[arg(long)]
        msk: PathBuf,
        /// Text file holding the function vector.
        #[arg(short, long)]
        y: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Encrypt a matrix read from a text file (one row per line).
    Encrypt {
        #[arg(short, long)]
        params: PathBuf,
        #[arg(long)]
        mpk: PathBuf,
        /// Text file holding the plaintext matrix.
        #[arg(short, long)]
        x: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Decrypt the per-row inner products with a function key.
    Decrypt {
        #[arg(short, long)]
        params: PathBuf,
        #[arg(long)]
        fk: PathBuf,
        #[arg(long)]
        ct: PathBuf,
    },
    /// Recover the full plaintext matrix with the master secret key.
    DecryptAll {
        #[arg(short, long)]
        params: PathBuf,
        #[arg(long)]
        msk: PathBuf,
        #[arg(long)]
        ct: PathBuf,
    },
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut rng = rand::thread_rng();
    match cli.cmd {
        Cmd::Params {
            sec,
            l,
            rows,
            bx,
            by,
            rounded,
            out,
        } => {
            let begin = Instant::now();
            let mut ipfe = ChainIpfe::search(sec, l, rows, bx, by)?;
            if rounded {
                ipfe.noise = GaussianSampler::Rounded;
            }
            info!("parameter search took {:?}", begin.elapsed());
            info!("ring: {:?}", ipfe.ring);
            save(&out, &ipfe)?;
        }
        Cmd::Keygen { params, out } => {
            let ipfe: ChainIpfe = load(&params)?;
            let begin = Instant::now();
            let msk = ipfe.keygen(&mut rng);
            info!("key generation took {:?}", begin.elapsed());
            save(&out, &msk)?;
        }
        Cmd::Pubkey { params, msk, out } => {
            let ipfe: ChainIpfe = load(&params)?;
            let msk: SecretKey<PrimeChainRing> = load(&msk)?;
            let begin = Instant::now();
            let mpk = ipfe.public_key_gen(&msk, &mut rng)?;
            info!("public-key generation took {:?}", begin.elapsed());
            save(&out, &mpk)?;
        }
        Cmd::Keyder {
            params,
            msk,
            y,
            out,
        } => {
            let ipfe: ChainIpfe = load(&params)?;
            let msk: SecretKey<PrimeChainRing> = load(&msk)?;
            let y = read_vector(&y)?;
            let begin = Instant::now();
            let fk = ipfe.derive_function_key(&msk, &y)?;
            info!("function-key derivation took {:?}", begin.elapsed());
            save(&out, &fk)?;
        }
        Cmd::Encrypt {
            params,
            mpk,
            x,
            out,
        } => {
            let ipfe: ChainIpfe = load(&params)?;
            let mpk: PublicKey<PrimeChainRing> = load(&mpk)?;
            let x = read_matrix(&x)?;
            let begin = Instant::now();
            let ct = ipfe.encrypt(&mpk, &x, &mut rng)?;
            info!("encryption of {} rows took {:?}", ct.rows, begin.elapsed());
            save(&out, &ct)?;
        }
        Cmd::Decrypt { params, fk, ct } => {
            let ipfe: ChainIpfe = load(&params)?;
            let fk: FunctionKey<PrimeChainRing> = load(&fk)?;
            let ct: Ciphertext<PrimeChainRing> = load(&ct)?;
            let begin = Instant::now();
            let values = ipfe.decrypt(&fk, &ct)?;
            info!("decryption took {:?}", begin.elapsed());
            for v in values {
                println!("{v}");
            }
        }
        Cmd::DecryptAll { params, msk, ct } => {
            let ipfe: ChainIpfe = load(&params)?;
            let msk: SecretKey<PrimeChainRing> = load(&msk)?;
            let ct: Ciphertext<PrimeChainRing> = load(&ct)?;
            let begin = Instant::now();
            let rows = ipfe.decrypt_all(&msk, &ct)?;
            info!("full decryption took {:?}", begin.elapsed());
            for row in rows {
                println!(
                    "{}",
                    row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
                );
            }
        }
    }
    Ok(())
}
