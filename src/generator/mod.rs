use log::debug;
use oorandom::Rand32;

mod rules;
pub use rules::*;

/// One 4/4 bar at 480 ticks per quarter note.
pub const TICKS_PER_BAR: u32 = 1920;

// Weighted duration pool: quarters dominate, with occasional eighths,
// halves, and a rare sixteenth.
const DURATION_POOL: [u32; 10] = [120, 240, 240, 240, 480, 480, 480, 480, 480, 960];

/// C-minor pitch pool, middle C up two octaves.
pub const PITCH_POOL: [u8; 15] = [
    60, 62, 63, 65, 67, 68, 70, 72, 74, 75, 77, 79, 80, 82, 84,
];

/// Accepts or rejects a candidate pitch given the melody generated so far.
///
/// Implementations only ever see the trailing window of prior pitches, so
/// rulesets can be swapped without touching the generator or the score core.
pub trait Acceptability {
    fn accept(&self, prior: &[u8], candidate: u8) -> bool;
}

/// Seeded source of rhythms and melodies. Identical seeds produce
/// identical output.
#[derive(Debug)]
pub struct Generator {
    rng: Rand32,
}

impl Generator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Rand32::new(seed),
        }
    }

    /// Generates note durations for `bars` bars of 4/4.
    ///
    /// Each bar's durations sum to exactly [`TICKS_PER_BAR`]; picks that
    /// would overshoot the bar are redrawn, and a bar never opens with a
    /// sixteenth note.
    pub fn rhythm(&mut self, bars: u32) -> Vec<u32> {
        let mut durations = Vec::new();

        for _ in 0..bars {
            let mut sum = 0;
            let mut first = true;
            while sum < TICKS_PER_BAR {
                let pick = self.pick(&DURATION_POOL);
                if first && pick == 120 {
                    continue;
                }
                if sum + pick > TICKS_PER_BAR {
                    continue;
                }
                sum += pick;
                first = false;
                durations.push(pick);
            }
        }

        debug!("Generated {} durations over {} bars..!", durations.len(), bars);
        durations
    }

    /// Generates `count` pitches from the pool, each filtered through
    /// `rules`. When a position rejects too many candidates in a row, the
    /// previous pitch is backed out and regenerated, since the trailing
    /// window may have painted the line into a corner.
    pub fn melody<A: Acceptability>(&mut self, count: usize, rules: &A) -> Vec<u8> {
        const MAX_ATTEMPTS: u32 = 64;

        let mut melody: Vec<u8> = Vec::with_capacity(count);
        let mut attempts = 0;
        while melody.len() < count {
            let candidate = self.pick(&PITCH_POOL);
            if rules.accept(&melody, candidate) {
                melody.push(candidate);
                attempts = 0;
            } else {
                attempts += 1;
                if attempts >= MAX_ATTEMPTS {
                    melody.pop();
                    attempts = 0;
                }
            }
        }

        debug!("Generated a {}-note melody..!", melody.len());
        melody
    }

    fn pick<T: Copy>(&mut self, pool: &[T]) -> T {
        pool[self.rng.rand_range(0..pool.len() as u32) as usize]
    }
}
