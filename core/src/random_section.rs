//! `random.*`: the generator snapshot.
//!
//! RULE: a missing or unusable snapshot is never fatal. The generator is
//! re-seeded from the load context's seed and the load goes on.

use crate::context::{LoadContext, SaveContext};
use crate::error::SaveResult;
use crate::rng::{GameRng, RNG_TABLE_SIZE, RNG_WORDS_PER_LINE};
use crate::secfile::SectionFile;
use crate::section::SaveSection;
use crate::world::World;

pub struct RandomSection;

fn table_path(line: usize) -> String {
    format!("random.table{line}")
}

/// Parse the snapshot. `Err` carries the reason it is unusable.
fn read_snapshot(file: &SectionFile) -> Result<GameRng, String> {
    let index = |key: &str| -> Result<usize, String> {
        let path = format!("random.index_{key}");
        let value = file.lookup_int(&path).ok_or_else(|| format!("'{path}' is missing"))?;
        usize::try_from(value)
            .ok()
            .filter(|&v| v < RNG_TABLE_SIZE)
            .ok_or_else(|| format!("'{path}' is out of range ({value})"))
    };

    let mut rng = GameRng::uninitialized();
    rng.j = index("J")?;
    rng.k = index("K")?;
    rng.x = index("X")?;

    for line in 0..RNG_TABLE_SIZE / RNG_WORDS_PER_LINE {
        let path = table_path(line);
        let text = file.lookup_str(&path).ok_or_else(|| format!("'{path}' is missing"))?;
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() != RNG_WORDS_PER_LINE {
            return Err(format!("'{path}' holds {} words", words.len()));
        }
        for (i, word) in words.iter().enumerate() {
            rng.v[line * RNG_WORDS_PER_LINE + i] = u32::from_str_radix(word, 16)
                .map_err(|_| format!("'{path}' holds a bad word '{word}'"))?;
        }
    }
    rng.is_init = true;
    Ok(rng)
}

impl SaveSection for RandomSection {
    fn name(&self) -> &'static str { "random" }

    fn load(&self, ctx: &mut LoadContext<'_>, world: &mut World) -> SaveResult<()> {
        let snapshot = if ctx.file.lookup_bool_or("random.save", false) {
            match read_snapshot(ctx.file) {
                Ok(rng) => Some(rng),
                Err(reason) => {
                    ctx.status.warn(format!("Random state unusable ({reason}), re-seeding"));
                    None
                }
            }
        } else {
            None
        };

        match snapshot {
            Some(rng) => {
                ctx.rstate = rng.clone();
                ctx.rstate_from_file = true;
                world.rng = rng;
            }
            None => {
                log::debug!("No random state saved, seeding with {}", ctx.seed);
                world.rng = GameRng::seeded(ctx.seed);
                ctx.rstate = world.rng.clone();
                ctx.rstate_from_file = false;
            }
        }
        Ok(())
    }

    fn save(&self, ctx: &mut SaveContext<'_>, world: &World) -> SaveResult<()> {
        let rng = &world.rng;
        if !ctx.config.save_random || !rng.is_valid() {
            ctx.file.set_bool("random.save", false);
            return Ok(());
        }

        ctx.file.set_bool("random.save", true);
        ctx.file.set_int("random.index_J", rng.j as i64);
        ctx.file.set_int("random.index_K", rng.k as i64);
        ctx.file.set_int("random.index_X", rng.x as i64);
        for (line, words) in rng.v.chunks(RNG_WORDS_PER_LINE).enumerate() {
            let text = words.iter().map(|w| format!("{w:08x}")).collect::<Vec<_>>().join(" ");
            ctx.file.set_str(&table_path(line), &text);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_lines_parse_back() {
        let rng = GameRng::seeded(7);
        let mut file = SectionFile::new();
        file.set_int("random.index_J", rng.j as i64);
        file.set_int("random.index_K", rng.k as i64);
        file.set_int("random.index_X", rng.x as i64);
        for (line, words) in rng.v.chunks(RNG_WORDS_PER_LINE).enumerate() {
            let text = words.iter().map(|w| format!("{w:08x}")).collect::<Vec<_>>().join(" ");
            file.set_str(&table_path(line), &text);
        }
        assert_eq!(read_snapshot(&file).expect("snapshot"), rng);

        file.set_int("random.index_K", 99);
        assert!(read_snapshot(&file).is_err());
    }
}
