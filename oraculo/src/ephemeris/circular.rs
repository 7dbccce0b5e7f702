use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{BodyPosition, EphemerisSource, Transits, BODIES};
use crate::error::Result;

/// Mean orbital elements at J2000: (semi-major axis AU, mean longitude °, daily motion °).
const PLANET_ELEMENTS: [(f64, f64, f64); 8] = [
    (0.38710, 252.2503, 4.092_334_4),
    (0.72333, 181.9791, 1.602_130_2),
    (1.52368, 355.4330, 0.524_020_8),
    (5.20260, 34.3515, 0.083_085_3),
    (9.55491, 50.0774, 0.033_444_2),
    (19.21845, 314.0550, 0.011_728_8),
    (30.11039, 304.3487, 0.005_981_0),
    (39.48169, 238.9288, 0.003_975_7),
];

/// Low-precision built-in source.
///
/// Sun and Moon use mean longitude plus the equation-of-centre term; planets
/// sit on circular heliocentric orbits projected onto the Earth. Good to a few
/// degrees, which is all the prompt needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircularOrbitEphemeris;

impl CircularOrbitEphemeris {
    pub fn compute(at: DateTime<Utc>) -> Transits {
        let d = days_since_j2000(at);

        let sun = sun_longitude(d);
        let (sun_x, sun_y) = (sun.to_radians().cos(), sun.to_radians().sin());

        let mut transits = Vec::with_capacity(BODIES.len());
        transits.push(BodyPosition::new(BODIES[0], sun));
        transits.push(BodyPosition::new(BODIES[1], moon_longitude(d)));

        for (name, (a, l0, n)) in BODIES[2..].iter().zip(PLANET_ELEMENTS) {
            let l = (l0 + n * d).to_radians();
            // Earth sits opposite the Sun, so geocentric = heliocentric + sun vector.
            let x = a * l.cos() + sun_x;
            let y = a * l.sin() + sun_y;
            transits.push(BodyPosition::new(*name, y.atan2(x).to_degrees()));
        }

        transits
    }
}

#[async_trait]
impl EphemerisSource for CircularOrbitEphemeris {
    async fn positions(&self, at: DateTime<Utc>) -> Result<Transits> {
        Ok(Self::compute(at))
    }

    fn name(&self) -> &'static str {
        "circular-orbit"
    }
}

/// 2000-01-01T12:00:00Z
const J2000_UNIX_SECS: i64 = 946_728_000;

fn days_since_j2000(at: DateTime<Utc>) -> f64 {
    (at.timestamp() - J2000_UNIX_SECS) as f64 / 86_400.0
}

fn sun_longitude(d: f64) -> f64 {
    let mean = 280.460 + 0.985_647_4 * d;
    let g = (357.528 + 0.985_600_3 * d).to_radians();
    mean + 1.915 * g.sin() + 0.020 * (2.0 * g).sin()
}

fn moon_longitude(d: f64) -> f64 {
    let mean = 218.316 + 13.176_396 * d;
    let m = (134.963 + 13.064_993 * d).to_radians();
    mean + 6.289 * m.sin()
}
