use crate::generator::Acceptability;

/// Default melodic filter: a small counterpoint ruleset over the trailing
/// window of prior pitches, tuned for short melancholic lines in C minor.
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterpointRules;

impl Acceptability for CounterpointRules {
    fn accept(&self, prior: &[u8], candidate: u8) -> bool {
        let n = prior.len();
        let c = i32::from(candidate);
        let at = |back: usize| i32::from(prior[n - back]);

        // Open on middle C.
        if n == 0 {
            return candidate == 60;
        }

        let step = c - at(1);

        // No immediate repetition.
        if step == 0 {
            return false;
        }

        // Ease into the line: the second note moves by step, not leap.
        if n == 1 && step.abs() > 2 {
            return false;
        }

        // No leap wider than a minor sixth.
        if step.abs() > 8 {
            return false;
        }

        // A leap wider than three semitones must not keep going the same
        // direction.
        if n >= 2 {
            let prev_step = at(1) - at(2);
            if prev_step > 3 && step > 0 {
                return false;
            }
            if prev_step < -3 && step < 0 {
                return false;
            }
        }

        // Notes four apart in the sequence stay within ten semitones.
        if n >= 4 && (c - at(4)).abs() > 10 {
            return false;
        }

        true
    }
}
