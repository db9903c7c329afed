use std::str::FromStr;

use crate::error::{invalid_input_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Start,
    End,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::End => "End",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            _ => Err(invalid_input_error()),
        }
    }
}

#[test]
fn role_from_path_segment() {
    assert_eq!("start".parse::<Role>().unwrap(), Role::Start);
    assert_eq!("end".parse::<Role>().unwrap(), Role::End);
    assert!("middle".parse::<Role>().is_err());
}
