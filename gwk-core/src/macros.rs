// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[rustfmt::skip]
macro_rules! call_for_tuples {
	($m:ident!) => {
		$m!(T1, TL);
		$m!(T1, (T2), TL);
		$m!(T1, (T2, T3), TL);
		$m!(T1, (T2, T3, T4), TL);
		$m!(T1, (T2, T3, T4, T5), TL);
		$m!(T1, (T2, T3, T4, T5, T6), TL);
		$m!(T1, (T2, T3, T4, T5, T6, T7), TL);
		$m!(T1, (T2, T3, T4, T5, T6, T7, T8), TL);
	};
}

// --------------------------------------------------------------------------------
