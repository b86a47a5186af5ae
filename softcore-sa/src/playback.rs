//! PWM audio output.
//!
//! A [`PwmPlayer`] holds the duty cycles of one frame and writes the next one
//! to a PWM channel on every sample-timer tick.

use embedded_hal::pwm::SetDutyCycle;

use crate::constants::FFT_SIZE;
use crate::frame::Frame;

/// Convert a duty percentage into a compare value for a channel whose full
/// scale is `max_duty`. The high time is truncated, never rounded up.
pub fn percent_to_duty(percent: f32, max_duty: u16) -> u16 {
    let percent = percent.clamp(0.0, 100.0);
    (percent * max_duty as f32 / 100.0) as u16
}

pub struct PwmPlayer<P: SetDutyCycle, const N: usize = FFT_SIZE> {
    pwm: P,
    duties: [u16; N],
    /// Next duty to output. `N` when nothing is loaded.
    pos: usize,
}

impl<P: SetDutyCycle, const N: usize> PwmPlayer<P, N> {
    pub fn new(pwm: P) -> Self {
        PwmPlayer {
            pwm,
            duties: [0; N],
            pos: N,
        }
    }

    /// Queue the duty cycles of `frame`, replacing anything not yet played.
    pub fn load(&mut self, frame: &Frame<N>) {
        let max = self.pwm.max_duty_cycle();
        for (d, &p) in self.duties.iter_mut().zip(frame.pwm.iter()) {
            *d = percent_to_duty(p, max);
        }
        self.pos = 0;
    }

    /// Output the next duty cycle. Returns `Ok(false)` once the loaded frame
    /// has been played out.
    pub fn tick(&mut self) -> Result<bool, P::Error> {
        let Some(&duty) = self.duties.get(self.pos) else {
            return Ok(false);
        };
        self.pwm.set_duty_cycle(duty)?;
        self.pos += 1;
        Ok(true)
    }

    /// Duty cycles still to be played.
    pub fn remaining(&self) -> usize {
        N - self.pos
    }

    /// Drive the output low and drop the queued frame.
    pub fn stop(&mut self) -> Result<(), P::Error> {
        self.pos = N;
        self.pwm.set_duty_cycle_fully_off()
    }

    pub fn free(self) -> P {
        self.pwm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::pcm16_to_pwm_percent;
    use alloc::vec::Vec;
    use core::convert::Infallible;

    struct MockPwm {
        max: u16,
        log: Vec<u16>,
    }

    impl embedded_hal::pwm::ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            self.max
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.log.push(duty);
            Ok(())
        }
    }

    fn frame_of(samples: [i16; 4]) -> Frame<4> {
        Frame {
            analysis: [0.0; 4],
            pwm: samples.map(pcm16_to_pwm_percent),
        }
    }

    #[test]
    fn duty_mapping() {
        assert_eq!(percent_to_duty(0.0, 1000), 0);
        assert_eq!(percent_to_duty(100.0, 1000), 1000);
        assert_eq!(percent_to_duty(50.0, 1000), 500);
        assert_eq!(percent_to_duty(33.39, 1000), 333);
        assert_eq!(percent_to_duty(100.0, u16::MAX), u16::MAX);
        // Out-of-range input is clamped
        assert_eq!(percent_to_duty(120.0, 1000), 1000);
        assert_eq!(percent_to_duty(-3.0, 1000), 0);
    }

    #[test]
    fn plays_a_frame_then_stops() {
        let mut player: PwmPlayer<_, 4> = PwmPlayer::new(MockPwm { max: 1000, log: Vec::new() });
        assert_eq!(player.tick(), Ok(false));

        player.load(&frame_of([i16::MIN, 0, i16::MAX, -16384]));
        assert_eq!(player.remaining(), 4);
        for _ in 0..4 {
            assert_eq!(player.tick(), Ok(true));
        }
        assert_eq!(player.tick(), Ok(false));
        assert_eq!(player.remaining(), 0);

        let pwm = player.free();
        assert_eq!(pwm.log, [0, 500, 1000, 250]);
    }

    #[test]
    fn reload_restarts_playback() {
        let mut player: PwmPlayer<_, 4> = PwmPlayer::new(MockPwm { max: 100, log: Vec::new() });
        player.load(&frame_of([0; 4]));
        player.tick().unwrap();
        player.load(&frame_of([i16::MAX; 4]));
        assert_eq!(player.remaining(), 4);
        player.tick().unwrap();
        assert_eq!(player.free().log, [50, 100]);
    }

    #[test]
    fn stop_drops_queue_and_drives_low() {
        let mut player: PwmPlayer<_, 4> = PwmPlayer::new(MockPwm { max: 100, log: Vec::new() });
        player.load(&frame_of([i16::MAX; 4]));
        player.tick().unwrap();
        player.stop().unwrap();
        assert_eq!(player.tick(), Ok(false));
        assert_eq!(player.free().log, [100, 0]);
    }
}
