use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct CallableRequest<'a, T> {
    pub data: &'a T,
}

#[derive(Deserialize, Debug)]
pub struct CallableResponse<T> {
    pub result: T,
}
