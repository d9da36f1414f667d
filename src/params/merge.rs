use super::ParamMap;
use crate::{error::Error, request::Request};

/// Merge query, body and path parameters into [`Request::params`].
///
/// Layers, from lowest to highest precedence: existing `params`, query
/// parameters, `body_params`, path parameters. `body_params` is also stored as
/// is in [`Request::body_params`].
pub fn merge(
    req: &mut Request,
    body_params: ParamMap,
    query_string_length: usize,
) -> Result<(), Error> {
    let mut params = req.params().fetched().cloned().unwrap_or_default();

    let query = req.fetch_query_params(query_string_length)?;
    params.extend(query.iter().map(|(k, v)| (k.clone(), v.clone())));
    params.extend(body_params.iter().map(|(k, v)| (k.clone(), v.clone())));
    params.extend(req.path_params().iter().map(|(k, v)| (k.clone(), v.clone())));

    req.set_params(params);
    req.set_body_params(body_params);
    Ok(())
}
