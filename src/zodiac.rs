//! Western zodiac sign lookup — a static calendar-range table, no AI involved.

use serde::Serialize;

use crate::numerology::NumerologyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ZodiacSign {
    pub name: &'static str,
    pub symbol: &'static str,
    pub element: Element,
    pub date_range: &'static str,
}

const ARIES: ZodiacSign = ZodiacSign {
    name: "Aries",
    symbol: "♈",
    element: Element::Fire,
    date_range: "March 21 - April 19",
};
const TAURUS: ZodiacSign = ZodiacSign {
    name: "Taurus",
    symbol: "♉",
    element: Element::Earth,
    date_range: "April 20 - May 20",
};
const GEMINI: ZodiacSign = ZodiacSign {
    name: "Gemini",
    symbol: "♊",
    element: Element::Air,
    date_range: "May 21 - June 20",
};
const CANCER: ZodiacSign = ZodiacSign {
    name: "Cancer",
    symbol: "♋",
    element: Element::Water,
    date_range: "June 21 - July 22",
};
const LEO: ZodiacSign = ZodiacSign {
    name: "Leo",
    symbol: "♌",
    element: Element::Fire,
    date_range: "July 23 - August 22",
};
const VIRGO: ZodiacSign = ZodiacSign {
    name: "Virgo",
    symbol: "♍",
    element: Element::Earth,
    date_range: "August 23 - September 22",
};
const LIBRA: ZodiacSign = ZodiacSign {
    name: "Libra",
    symbol: "♎",
    element: Element::Air,
    date_range: "September 23 - October 22",
};
const SCORPIO: ZodiacSign = ZodiacSign {
    name: "Scorpio",
    symbol: "♏",
    element: Element::Water,
    date_range: "October 23 - November 21",
};
const SAGITTARIUS: ZodiacSign = ZodiacSign {
    name: "Sagittarius",
    symbol: "♐",
    element: Element::Fire,
    date_range: "November 22 - December 21",
};
const CAPRICORN: ZodiacSign = ZodiacSign {
    name: "Capricorn",
    symbol: "♑",
    element: Element::Earth,
    date_range: "December 22 - January 19",
};
const AQUARIUS: ZodiacSign = ZodiacSign {
    name: "Aquarius",
    symbol: "♒",
    element: Element::Air,
    date_range: "January 20 - February 18",
};
const PISCES: ZodiacSign = ZodiacSign {
    name: "Pisces",
    symbol: "♓",
    element: Element::Water,
    date_range: "February 19 - March 20",
};

/// Sign for a calendar month/day. Pisces is the fallthrough arm, covering
/// February 19 – March 20 after every other range has been excluded.
pub fn sign_for(month: u32, day: u32) -> &'static ZodiacSign {
    match (month, day) {
        (3, 21..) | (4, ..=19) => &ARIES,
        (4, 20..) | (5, ..=20) => &TAURUS,
        (5, 21..) | (6, ..=20) => &GEMINI,
        (6, 21..) | (7, ..=22) => &CANCER,
        (7, 23..) | (8, ..=22) => &LEO,
        (8, 23..) | (9, ..=22) => &VIRGO,
        (9, 23..) | (10, ..=22) => &LIBRA,
        (10, 23..) | (11, ..=21) => &SCORPIO,
        (11, 22..) | (12, ..=21) => &SAGITTARIUS,
        (12, 22..) | (1, ..=19) => &CAPRICORN,
        (1, 20..) | (2, ..=18) => &AQUARIUS,
        _ => &PISCES,
    }
}

/// Sign for a `YYYY-MM-DD` birth date.
pub fn sign_for_date(birth_date: &str) -> Result<&'static ZodiacSign, NumerologyError> {
    let date = chrono::NaiveDate::parse_from_str(birth_date, "%Y-%m-%d")
        .map_err(|_| NumerologyError::InvalidDateFormat(birth_date.to_string()))?;
    use chrono::Datelike;
    Ok(sign_for(date.month(), date.day()))
}
